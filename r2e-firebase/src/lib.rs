//! Firebase ID token validation.
//!
//! [`FirebaseValidator`] keeps Google's rotating signing certificates cached,
//! refreshes them in the background ahead of their declared expiry, and
//! verifies RS256 ID tokens and their claims without a network round-trip
//! per request.

pub mod certificate;
pub mod claims;
pub mod config;
pub mod error;
pub mod keyset;
pub mod validator;
pub mod verifier;

pub use certificate::{decode_certificate, PublicKey};
pub use claims::{Claims, ProfileClaims, RegisteredClaims, SignInClaims};
pub use config::{FirebaseConfig, DEFAULT_KEYSET_URL};
pub use error::FirebaseError;
pub use keyset::{KeySet, KeyStore};
pub use validator::FirebaseValidator;
pub use verifier::{validate_claims, TokenVerifier, VerifiedToken};

pub mod prelude {
    //! Re-exports of the most commonly used Firebase types.
    pub use crate::{Claims, FirebaseConfig, FirebaseError, FirebaseValidator};
}
