use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Claims carried by a Firebase ID token.
///
/// On the wire this is one flat JSON object; in memory it is split into the
/// registered JWT claims and the Firebase profile claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,

    #[serde(flatten)]
    pub profile: ProfileClaims,
}

/// Standard JWT claims. Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    #[serde(rename = "sub", default)]
    pub subject: String,

    #[serde(rename = "aud", default)]
    pub audience: String,

    #[serde(rename = "iss", default)]
    pub issuer: String,

    #[serde(rename = "iat", default)]
    pub issued_at: i64,

    #[serde(rename = "exp", default)]
    pub expires_at: i64,

    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,
}

/// Firebase-specific user profile claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Time the user authenticated, seconds since the Unix epoch.
    #[serde(rename = "auth_time", default, skip_serializing_if = "Option::is_none")]
    pub auth_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase: Option<SignInClaims>,
}

/// The nested `firebase` claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInClaims {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sign_in_provider: String,

    /// Provider name (e.g. `google.com`, `email`) to linked identities.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub identities: HashMap<String, Vec<String>>,
}

impl Claims {
    /// The `sub` claim.
    pub fn subject(&self) -> &str {
        &self.registered.subject
    }

    /// The provider the user signed in with, if present.
    pub fn sign_in_provider(&self) -> Option<&str> {
        self.profile
            .firebase
            .as_ref()
            .map(|fb| fb.sign_in_provider.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Identities linked for the given provider, empty when there are none.
    pub fn identities_for(&self, provider: &str) -> &[String] {
        self.profile
            .firebase
            .as_ref()
            .and_then(|fb| fb.identities.get(provider))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
