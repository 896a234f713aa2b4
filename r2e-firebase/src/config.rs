use std::time::Duration;

use crate::error::FirebaseError;

/// Google endpoint publishing the X.509 certificates that sign Firebase ID tokens.
pub const DEFAULT_KEYSET_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Configuration for Firebase ID token validation and the certificate cache.
#[derive(Clone, Debug)]
pub struct FirebaseConfig {
    /// Expected audience in the "aud" claim (the Firebase project ID).
    pub audience: String,

    /// Expected issuer in the "iss" claim.
    pub issuer: String,

    /// URL of the certificate keyset endpoint.
    pub keyset_url: String,

    /// How long before the declared keyset expiry a refresh is attempted (default: 1h).
    pub refresh_margin: Duration,

    /// Lower bound for the delay between two refresh attempts (default: 1min).
    pub min_refresh_interval: Duration,
}

impl FirebaseConfig {
    /// Create a config for the given Firebase project.
    ///
    /// The issuer is derived as `https://securetoken.google.com/<project_id>` and
    /// the keyset is fetched from [`DEFAULT_KEYSET_URL`].
    pub fn new(project_id: impl Into<String>) -> Self {
        let audience = project_id.into();
        Self {
            issuer: format!("{ISSUER_PREFIX}{audience}"),
            audience,
            keyset_url: DEFAULT_KEYSET_URL.to_string(),
            refresh_margin: Duration::from_secs(3600),
            min_refresh_interval: Duration::from_secs(60),
        }
    }

    /// Override the expected issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Fetch certificates from a different endpoint (emulators, tests).
    pub fn with_keyset_url(mut self, url: impl Into<String>) -> Self {
        self.keyset_url = url.into();
        self
    }

    /// Set the safety margin subtracted from the keyset expiry.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Set the minimum delay between refresh attempts.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Check that the configuration can be used to build a validator.
    pub fn validate(&self) -> Result<(), FirebaseError> {
        if self.audience.trim().is_empty() {
            return Err(FirebaseError::ConfigError("audience must not be empty".into()));
        }
        if self.issuer.trim().is_empty() {
            return Err(FirebaseError::ConfigError("issuer must not be empty".into()));
        }
        let url = reqwest::Url::parse(&self.keyset_url).map_err(|e| {
            FirebaseError::ConfigError(format!("invalid keyset URL {:?}: {e}", self.keyset_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FirebaseError::ConfigError(format!(
                "unsupported keyset URL scheme: {}",
                url.scheme()
            )));
        }
        if self.min_refresh_interval.is_zero() {
            return Err(FirebaseError::ConfigError(
                "min_refresh_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
