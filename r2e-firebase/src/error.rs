/// Errors produced while refreshing the certificate cache or validating
/// Firebase ID tokens.
///
/// Every variant maps to a stable [`code`](FirebaseError::code) so callers
/// can tell malformed input apart from expired credentials or unknown
/// signing keys in logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirebaseError {
    /// The validator configuration is unusable (empty audience, bad URL, ...).
    ConfigError(String),

    /// The keyset endpoint could not be reached or answered with an error status.
    NetworkError(String),

    /// The keyset response was malformed (`Expires` header, JSON, PEM or DER).
    FormatError(String),

    /// A certificate carries a public key that is not RSA.
    UnsupportedAlgorithm(String),

    /// The token is not a three-segment base64url compact JWT.
    MalformedToken(String),

    /// The token header has no string `kid`.
    MissingKeyId,

    /// The `kid` from the token header is not in the current keyset.
    UnknownKeyId(String),

    /// The RS256 signature does not match the resolved key.
    InvalidSignature,

    /// `exp` is not in the future.
    Expired,

    /// `iat` is in the future.
    IssuedInFuture,

    /// `nbf` is in the future.
    NotYetValid,

    /// `aud` does not match the configured audience.
    InvalidAudience(String),

    /// `iss` does not match the configured issuer.
    InvalidIssuer(String),

    /// `sub` is empty or missing.
    MissingSubject,

    /// `auth_time` is in the future.
    AuthTimeInFuture,
}

impl FirebaseError {
    /// Stable, machine-readable identifier for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            FirebaseError::ConfigError(_) => "config_error",
            FirebaseError::NetworkError(_) => "network_error",
            FirebaseError::FormatError(_) => "format_error",
            FirebaseError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            FirebaseError::MalformedToken(_) => "malformed_token",
            FirebaseError::MissingKeyId => "missing_key_id",
            FirebaseError::UnknownKeyId(_) => "unknown_key_id",
            FirebaseError::InvalidSignature => "invalid_signature",
            FirebaseError::Expired => "expired",
            FirebaseError::IssuedInFuture => "issued_in_future",
            FirebaseError::NotYetValid => "not_yet_valid",
            FirebaseError::InvalidAudience(_) => "invalid_audience",
            FirebaseError::InvalidIssuer(_) => "invalid_issuer",
            FirebaseError::MissingSubject => "missing_subject",
            FirebaseError::AuthTimeInFuture => "auth_time_in_future",
        }
    }

    /// Returns `true` for failures caused by the presented token rather than
    /// by configuration or the keyset endpoint.
    pub fn is_token_error(&self) -> bool {
        !matches!(
            self,
            FirebaseError::ConfigError(_)
                | FirebaseError::NetworkError(_)
                | FirebaseError::FormatError(_)
                | FirebaseError::UnsupportedAlgorithm(_)
        )
    }
}

impl std::fmt::Display for FirebaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirebaseError::ConfigError(msg) => write!(f, "Invalid configuration: {msg}"),
            FirebaseError::NetworkError(msg) => write!(f, "Keyset fetch error: {msg}"),
            FirebaseError::FormatError(msg) => write!(f, "Malformed keyset: {msg}"),
            FirebaseError::UnsupportedAlgorithm(alg) => {
                write!(f, "Unsupported public key algorithm: {alg}")
            }
            FirebaseError::MalformedToken(msg) => write!(f, "Malformed token: {msg}"),
            FirebaseError::MissingKeyId => write!(f, "Missing kid header"),
            FirebaseError::UnknownKeyId(kid) => write!(f, "Unknown signing key: {kid}"),
            FirebaseError::InvalidSignature => write!(f, "Invalid token signature"),
            FirebaseError::Expired => write!(f, "Token has expired"),
            FirebaseError::IssuedInFuture => write!(f, "Token issued in the future"),
            FirebaseError::NotYetValid => write!(f, "Token not yet valid"),
            FirebaseError::InvalidAudience(aud) => write!(f, "Invalid audience claim: {aud}"),
            FirebaseError::InvalidIssuer(iss) => write!(f, "Invalid issuer claim: {iss}"),
            FirebaseError::MissingSubject => write!(f, "Subject is missing"),
            FirebaseError::AuthTimeInFuture => write!(f, "Auth time in the future"),
        }
    }
}

impl std::error::Error for FirebaseError {}
