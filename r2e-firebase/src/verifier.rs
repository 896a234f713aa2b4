use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use tracing::{debug, warn};

use crate::claims::Claims;
use crate::error::FirebaseError;
use crate::keyset::KeySet;

/// A token whose signature and claims have been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// The `kid` header that selected the signing key.
    pub key_id: String,
    /// The signature algorithm from the token header.
    pub algorithm: Algorithm,
    pub claims: Claims,
}

/// Verifies compact Firebase ID tokens against a [`KeySet`] snapshot.
///
/// The pipeline short-circuits on the first failure:
/// 1. three base64url segments
/// 2. string `kid` in the header
/// 3. `kid` present in the keyset
/// 4. RS256 signature
/// 5. claims, see [`validate_claims`]
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    audience: String,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(audience: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
        }
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify `token` using the keys in `keys`, with `now` as the current
    /// Unix time in seconds.
    pub fn verify(
        &self,
        token: &str,
        keys: &KeySet,
        now: i64,
    ) -> Result<VerifiedToken, FirebaseError> {
        let header = decode_segments(token)?;

        let kid = header
            .get("kid")
            .and_then(serde_json::Value::as_str)
            .ok_or(FirebaseError::MissingKeyId)?;

        let key = keys
            .get(kid)
            .ok_or_else(|| FirebaseError::UnknownKeyId(kid.to_string()))?;

        let alg = header.get("alg").and_then(serde_json::Value::as_str);
        if alg.and_then(|alg| alg.parse::<Algorithm>().ok()) != Some(key.algorithm()) {
            warn!(kid = %kid, alg = ?alg, "Firebase token signed with unexpected algorithm");
            return Err(FirebaseError::InvalidSignature);
        }

        let mut validation = Validation::new(key.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Claims>(token, key.decoding_key(), &validation).map_err(|e| {
            let err = match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    FirebaseError::InvalidSignature
                }
                _ => FirebaseError::MalformedToken(e.to_string()),
            };
            warn!(kid = %kid, error = %err, "Firebase token rejected");
            err
        })?;

        validate_claims(&data.claims, &self.audience, &self.issuer, now).inspect_err(|err| {
            warn!(
                kid = %kid,
                sub = %data.claims.subject(),
                code = err.code(),
                "Firebase token claims rejected"
            );
        })?;

        debug!(kid = %kid, sub = %data.claims.subject(), "Firebase token verified");
        Ok(VerifiedToken {
            key_id: kid.to_string(),
            algorithm: data.header.alg,
            claims: data.claims,
        })
    }
}

/// Check the structure of a compact token and return its decoded header.
fn decode_segments(token: &str) -> Result<serde_json::Value, FirebaseError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(FirebaseError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    for segment in &segments[1..] {
        if !is_base64url(segment) {
            return Err(FirebaseError::MalformedToken("invalid base64url segment".into()));
        }
    }

    let header = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|e| FirebaseError::MalformedToken(format!("invalid base64url segment: {e}")))?;
    let header: serde_json::Value = serde_json::from_slice(&header)
        .map_err(|e| FirebaseError::MalformedToken(format!("invalid header: {e}")))?;
    if !header.is_object() {
        return Err(FirebaseError::MalformedToken("header is not a JSON object".into()));
    }
    Ok(header)
}

/// Unpadded base64url alphabet with a length that can encode whole bytes.
fn is_base64url(segment: &str) -> bool {
    segment.len() % 4 != 1
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Validate decoded claims in a fixed order; the first failing check wins.
///
/// exp, iat, nbf, aud, iss, sub, auth_time.
pub fn validate_claims(
    claims: &Claims,
    audience: &str,
    issuer: &str,
    now: i64,
) -> Result<(), FirebaseError> {
    let reg = &claims.registered;

    if reg.expires_at <= now {
        return Err(FirebaseError::Expired);
    }
    if reg.issued_at > now {
        return Err(FirebaseError::IssuedInFuture);
    }
    if reg.not_before.is_some_and(|nbf| nbf > now) {
        return Err(FirebaseError::NotYetValid);
    }
    if reg.audience != audience {
        return Err(FirebaseError::InvalidAudience(reg.audience.clone()));
    }
    if reg.issuer != issuer {
        return Err(FirebaseError::InvalidIssuer(reg.issuer.clone()));
    }
    if reg.subject.is_empty() {
        return Err(FirebaseError::MissingSubject);
    }
    if claims.profile.auth_at.is_some_and(|at| at > now) {
        return Err(FirebaseError::AuthTimeInFuture);
    }
    Ok(())
}
