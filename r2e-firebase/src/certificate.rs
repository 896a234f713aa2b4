use jsonwebtoken::{Algorithm, DecodingKey};
use x509_parser::oid_registry::OID_PKCS1_RSAENCRYPTION;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey as SpkiKey;

use crate::error::FirebaseError;

/// RSA public key extracted from a signing certificate.
///
/// Holds the verification key together with the algorithm it is used for.
/// Only RS256 keys are ever produced.
#[derive(Clone)]
pub struct PublicKey {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl PublicKey {
    /// The key used for signature verification.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }

    /// The signature algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Decode a PEM-armored X.509 certificate into an RSA public key.
///
/// Fails with [`FirebaseError::FormatError`] when there is no PEM block or
/// the DER is malformed, and with [`FirebaseError::UnsupportedAlgorithm`]
/// when the certificate key is not RSA.
pub fn decode_certificate(pem: &str) -> Result<PublicKey, FirebaseError> {
    let (_, block) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| FirebaseError::FormatError(format!("invalid certificate PEM: {e}")))?;

    let cert = block
        .parse_x509()
        .map_err(|e| FirebaseError::FormatError(format!("invalid certificate: {e}")))?;

    let spki = cert.public_key();
    if spki.algorithm.algorithm != OID_PKCS1_RSAENCRYPTION {
        return Err(FirebaseError::UnsupportedAlgorithm(
            spki.algorithm.algorithm.to_id_string(),
        ));
    }

    match spki.parsed() {
        Ok(SpkiKey::RSA(rsa)) => Ok(PublicKey {
            key: DecodingKey::from_rsa_raw_components(rsa.modulus, rsa.exponent),
            algorithm: Algorithm::RS256,
        }),
        Ok(_) => Err(FirebaseError::UnsupportedAlgorithm(
            spki.algorithm.algorithm.to_id_string(),
        )),
        Err(e) => Err(FirebaseError::FormatError(format!(
            "invalid RSA public key: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pem_block() {
        let err = decode_certificate("definitely not a certificate").unwrap_err();
        assert!(matches!(err, FirebaseError::FormatError(_)), "got {err}");
    }

    #[test]
    fn malformed_der() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAECAwQF\n-----END CERTIFICATE-----\n";
        let err = decode_certificate(pem).unwrap_err();
        assert!(matches!(err, FirebaseError::FormatError(_)), "got {err}");
    }
}
