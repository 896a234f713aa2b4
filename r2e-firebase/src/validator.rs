use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::claims::Claims;
use crate::config::FirebaseConfig;
use crate::error::FirebaseError;
use crate::keyset::{next_refresh_delay, KeyStore};
use crate::verifier::{TokenVerifier, VerifiedToken};

/// Firebase ID token validator.
///
/// Owns a certificate cache and one background task that refreshes it
/// ahead of the expiry declared by the keyset endpoint. Construction fails
/// unless the first fetch succeeds, so a validator always has keys.
///
/// All methods take `&self` and are safe to call concurrently; wrap the
/// validator in an `Arc` to share it.
///
/// # Example
///
/// ```ignore
/// let validator = FirebaseValidator::new(FirebaseConfig::new("my-project")).await?;
/// let claims = validator.decode(token)?;
/// println!("signed in as {}", claims.subject());
/// ```
pub struct FirebaseValidator {
    store: Arc<KeyStore>,
    verifier: TokenVerifier,
    config: FirebaseConfig,
    cancel: CancellationToken,
}

impl FirebaseValidator {
    /// Create a validator using a default HTTP client.
    pub async fn new(config: FirebaseConfig) -> Result<Self, FirebaseError> {
        Self::with_client(config, reqwest::Client::new()).await
    }

    /// Create a validator that fetches certificates with the given client.
    ///
    /// Timeouts, TLS and proxy settings belong on the client.
    pub async fn with_client(
        config: FirebaseConfig,
        client: reqwest::Client,
    ) -> Result<Self, FirebaseError> {
        config.validate()?;

        let store = Arc::new(KeyStore::connect(config.keyset_url.clone(), client).await?);
        let verifier = TokenVerifier::new(config.audience.clone(), config.issuer.clone());
        let cancel = CancellationToken::new();

        tokio::spawn(refresh_loop(
            store.clone(),
            config.refresh_margin,
            config.min_refresh_interval,
            cancel.clone(),
        ));

        Ok(Self {
            store,
            verifier,
            config,
            cancel,
        })
    }

    /// Verify a token and return its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, FirebaseError> {
        self.decode_token(token).map(|verified| verified.claims)
    }

    /// Verify a token and return its claims together with header details.
    pub fn decode_token(&self, token: &str) -> Result<VerifiedToken, FirebaseError> {
        let keys = self.store.snapshot();
        self.verifier.verify(token, &keys, Utc::now().timestamp())
    }

    /// Expiry declared by the keyset endpoint for the current keys.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.store.expires_at()
    }

    /// Whether the declared keyset expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at() <= Utc::now()
    }

    /// Whether the declared keyset expiry falls within `window` from now.
    pub fn expires_within(&self, window: Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => self.expires_at() <= Utc::now() + window,
            Err(_) => true,
        }
    }

    /// Key ids in the current keyset.
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.store.snapshot().key_ids().map(String::from).collect();
        ids.sort();
        ids
    }

    /// Fetch the keyset now. Same semantics as a scheduled refresh, but the
    /// error is returned to the caller.
    pub async fn refresh(&self) -> Result<(), FirebaseError> {
        self.store.refresh().await
    }

    /// Stop the background refresh task. No new fetch is started afterwards.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }
}

impl Drop for FirebaseValidator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn refresh_loop(
    store: Arc<KeyStore>,
    margin: Duration,
    floor: Duration,
    cancel: CancellationToken,
) {
    loop {
        let delay = next_refresh_delay(store.expires_at(), Utc::now(), margin, floor);
        debug!(delay_ms = delay.as_millis() as u64, "Next Firebase keyset refresh scheduled");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => break,
        }

        // A fetch in flight when stop() is called completes, but its result is dropped.
        match store.refresh_if(|| !cancel.is_cancelled()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) if cancel.is_cancelled() => break,
            Err(err) => {
                warn!(error = %err, code = err.code(), "Failed to refresh Firebase keyset");
            }
        }
    }
    debug!("Firebase keyset refresh loop stopped");
}
