#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use r2e_firebase::{
    Claims, FirebaseConfig, FirebaseValidator, ProfileClaims, RegisteredClaims, SignInClaims,
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT: &str = "mock-project";
pub const ISSUER: &str = "https://securetoken.google.com/mock-project";
pub const EXPIRES: &str = "Mon, 20 Jan 2020 23:40:59 GMT";
pub const CERTS_PATH: &str = "/certs";

/// RSA signing key with a matching self-signed certificate.
pub struct TestKey {
    pub private_pem: String,
    pub cert_pem: String,
}

impl TestKey {
    fn generate() -> Self {
        let private_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048)
            .expect("failed to generate RSA-2048 key");
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("failed to export RSA key as PKCS8 PEM")
            .to_string();

        let key_pair = rcgen::KeyPair::from_pem_and_sign_algo(&private_pem, &rcgen::PKCS_RSA_SHA256)
            .expect("failed to load RSA key into rcgen");
        let params = rcgen::CertificateParams::new(vec!["securetoken.test".to_string()])
            .expect("invalid certificate params");
        let cert_pem = params.self_signed(&key_pair).expect("failed to self-sign").pem();

        Self { private_pem, cert_pem }
    }

    pub fn sign(&self, kid: Option<&str>, claims: &impl serde::Serialize) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(String::from);
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("invalid RSA PEM");
        encode(&header, claims, &key).expect("failed to sign token")
    }
}

/// The key published as `kid1`.
pub fn key_a() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(TestKey::generate)
}

/// A second key, not published unless a test mounts it.
pub fn key_b() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(TestKey::generate)
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn valid_claims() -> Claims {
    let now = now();
    Claims {
        registered: RegisteredClaims {
            subject: "MDYwNDQwNjUtYWQ0ZC00ZDkwLThl".into(),
            audience: PROJECT.into(),
            issuer: ISSUER.into(),
            issued_at: now - 1800,
            expires_at: now + 3600,
            not_before: None,
        },
        profile: ProfileClaims {
            name: Some("Me".into()),
            picture: Some("https://test.host/me.jpg".into()),
            user_id: Some("MDYwNDQwNjUtYWQ0ZC00ZDkwLThl".into()),
            auth_at: Some(now),
            email: Some("me@example.com".into()),
            email_verified: true,
            firebase: Some(SignInClaims {
                sign_in_provider: "google.com".into(),
                identities: HashMap::from([
                    ("google.com".to_string(), vec!["123123123123123123123".to_string()]),
                    ("email".to_string(), vec!["me@example.com".to_string()]),
                ]),
            }),
        },
    }
}

pub fn keyset_response(keys: &[(&str, &TestKey)], expires: Option<&str>) -> ResponseTemplate {
    let body: HashMap<&str, &str> = keys
        .iter()
        .map(|(kid, key)| (*kid, key.cert_pem.as_str()))
        .collect();
    let mut response = ResponseTemplate::new(200).set_body_json(body);
    if let Some(expires) = expires {
        response = response.insert_header("expires", expires);
    }
    response
}

pub async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mock endpoint publishing `key_a()` as `kid1`.
pub async fn keyset_server() -> MockServer {
    let server = MockServer::start().await;
    mount(&server, keyset_response(&[("kid1", key_a())], Some(EXPIRES))).await;
    server
}

pub fn test_config(server: &MockServer) -> FirebaseConfig {
    FirebaseConfig::new(PROJECT).with_keyset_url(format!("{}{CERTS_PATH}", server.uri()))
}

pub async fn validator(server: &MockServer) -> FirebaseValidator {
    FirebaseValidator::new(test_config(server))
        .await
        .expect("validator should start")
}

pub async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
