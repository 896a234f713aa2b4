use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use reqwest::header::EXPIRES;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::certificate::{decode_certificate, PublicKey};
use crate::error::FirebaseError;

/// Immutable snapshot of the signing keys and their declared expiry.
///
/// A new `KeySet` is built on every successful refresh and swapped in
/// wholesale; existing snapshots are never mutated.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: HashMap<String, PublicKey>,
    expires_at: DateTime<Utc>,
}

impl KeySet {
    pub fn new(keys: HashMap<String, PublicKey>, expires_at: DateTime<Utc>) -> Self {
        Self { keys, expires_at }
    }

    pub fn get(&self, kid: &str) -> Option<&PublicKey> {
        self.keys.get(kid)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse a keyset response: the `Expires` header value and the JSON body
    /// mapping key ids to PEM certificates.
    ///
    /// Any malformed entry fails the whole keyset.
    pub fn from_response(expires: Option<&str>, body: &[u8]) -> Result<Self, FirebaseError> {
        let expires = expires
            .ok_or_else(|| FirebaseError::FormatError("missing Expires header".into()))?;
        let expires_at = parse_expires(expires)?;

        let certs: HashMap<String, String> = serde_json::from_slice(body)
            .map_err(|e| FirebaseError::FormatError(format!("invalid keyset JSON: {e}")))?;

        let keys = certs
            .iter()
            .map(|(kid, pem)| decode_certificate(pem).map(|key| (kid.clone(), key)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self::new(keys, expires_at))
    }
}

/// Parse an RFC 1123 HTTP date such as `Mon, 20 Jan 2020 23:40:59 GMT`.
fn parse_expires(value: &str) -> Result<DateTime<Utc>, FirebaseError> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FirebaseError::FormatError(format!("invalid Expires header {value:?}: {e}")))
}

/// Delay until the next refresh attempt: `(expires_at - now) - margin`,
/// never shorter than `floor`.
pub fn next_refresh_delay(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    margin: Duration,
    floor: Duration,
) -> Duration {
    let remaining = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
    remaining.saturating_sub(margin).max(floor)
}

/// Certificate cache backed by the remote keyset endpoint.
///
/// Readers load the current [`KeySet`] snapshot lock-free. Refreshes are
/// serialized and publish a complete new snapshot, so a reader sees either
/// the previous or the new keyset, never a mix.
pub struct KeyStore {
    current: ArcSwap<KeySet>,
    url: String,
    client: reqwest::Client,
    refresh_lock: Mutex<()>,
}

impl KeyStore {
    /// Create a store and perform the initial fetch.
    ///
    /// Fails if the first fetch fails; a store is never observable without keys.
    pub async fn connect(
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self, FirebaseError> {
        let url = url.into();
        let initial = fetch_keyset(&client, &url).await?;
        info!(
            url = %url,
            keys = initial.len(),
            expires_at = %initial.expires_at(),
            "Loaded Firebase keyset"
        );
        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            url,
            client,
            refresh_lock: Mutex::new(()),
        })
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.current.load_full()
    }

    /// Declared expiry of the current snapshot.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.current.load().expires_at()
    }

    /// Fetch the keyset and publish it on success.
    ///
    /// On failure the previous snapshot stays in effect.
    pub async fn refresh(&self) -> Result<(), FirebaseError> {
        self.refresh_if(|| true).await.map(|_| ())
    }

    /// Fetch and publish the keyset while `proceed` holds. It is checked
    /// before the fetch starts and again before publishing, so the background
    /// loop never starts a fetch after cancellation and drops late results.
    pub(crate) async fn refresh_if<F>(&self, proceed: F) -> Result<bool, FirebaseError>
    where
        F: Fn() -> bool,
    {
        let _guard = self.refresh_lock.lock().await;
        if !proceed() {
            return Ok(false);
        }
        let keyset = fetch_keyset(&self.client, &self.url).await?;
        if !proceed() {
            debug!(url = %self.url, "Discarding fetched keyset");
            return Ok(false);
        }
        self.publish(keyset);
        Ok(true)
    }

    fn publish(&self, keyset: KeySet) {
        info!(
            url = %self.url,
            keys = keyset.len(),
            expires_at = %keyset.expires_at(),
            "Refreshed Firebase keyset"
        );
        self.current.store(Arc::new(keyset));
    }
}

async fn fetch_keyset(client: &reqwest::Client, url: &str) -> Result<KeySet, FirebaseError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FirebaseError::NetworkError(e.to_string()))?;

    let response = response
        .error_for_status()
        .map_err(|e| FirebaseError::NetworkError(e.to_string()))?;

    let expires = match response.headers().get(EXPIRES) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|e| FirebaseError::FormatError(format!("invalid Expires header: {e}")))?
                .to_string(),
        ),
        None => None,
    };

    let body = response
        .bytes()
        .await
        .map_err(|e| FirebaseError::NetworkError(format!("failed to read keyset body: {e}")))?;

    KeySet::from_response(expires.as_deref(), &body)
}
