//! Tagged application public keys.
//!
//! A key is a point on one of two supported curve families, carried as its
//! 33-byte SEC1 compressed encoding. The family tag is explicit — every
//! piece of digest and recovery code dispatches on it — but the tag byte is
//! *not* part of the canonical digest form: only the raw point bytes are
//! hashed, so the same point registered under the same family always yields
//! the same fingerprint.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{AuthError, Digest, Result};

/// Curve family of an application key or signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// secp256k1 (Koblitz curve).
    Secp256k1,
    /// NIST P-256 (secp256r1).
    NistP256,
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secp256k1 => write!(f, "secp256k1"),
            Self::NistP256 => write!(f, "nist-p256"),
        }
    }
}

/// An application public key: algorithm tag plus SEC1 compressed point.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationKey {
    /// Key on secp256k1.
    Secp256k1(#[serde(with = "serde_bytes")] [u8; 33]),
    /// Key on NIST P-256.
    NistP256(#[serde(with = "serde_bytes")] [u8; 33]),
}

impl ApplicationKey {
    /// Parse and validate a secp256k1 key from SEC1 bytes (compressed or
    /// uncompressed); stored compressed.
    pub fn secp256k1(sec1: &[u8]) -> Result<Self> {
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(sec1)
            .map_err(|err| AuthError::MalformedKey(err.to_string()))?;
        let point = key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Ok(Self::Secp256k1(bytes))
    }

    /// Parse and validate a NIST P-256 key from SEC1 bytes (compressed or
    /// uncompressed); stored compressed.
    pub fn nist_p256(sec1: &[u8]) -> Result<Self> {
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(sec1)
            .map_err(|err| AuthError::MalformedKey(err.to_string()))?;
        let point = key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Ok(Self::NistP256(bytes))
    }

    /// The curve family this key lives on.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Secp256k1(_) => KeyAlgorithm::Secp256k1,
            Self::NistP256(_) => KeyAlgorithm::NistP256,
        }
    }

    /// Raw compressed point bytes with the family tag stripped.
    ///
    /// This is the canonical digest form of a key: clients hash exactly
    /// these 33 bytes when building a payload to sign.
    pub fn point_bytes(&self) -> &[u8; 33] {
        match self {
            Self::Secp256k1(bytes) | Self::NistP256(bytes) => bytes,
        }
    }

    /// 256-bit fingerprint over the raw point bytes, used for registry
    /// lookups by key.
    pub fn fingerprint(&self) -> Digest {
        Digest::of_bytes(self.point_bytes())
    }

    /// Constant-time equality over tag and point bytes.
    pub fn ct_eq(&self, other: &Self) -> bool {
        if self.algorithm() != other.algorithm() {
            return false;
        }
        bool::from(self.point_bytes().ct_eq(other.point_bytes()))
    }
}

impl std::fmt::Debug for ApplicationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ApplicationKey({}:{})",
            self.algorithm(),
            hex::encode(self.point_bytes())
        )
    }
}

impl std::fmt::Display for ApplicationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm(), hex::encode(self.point_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestKeypair;

    #[test]
    fn test_parse_round_trip_secp256k1() {
        let key = TestKeypair::generate_secp256k1().public_key();
        let parsed = ApplicationKey::secp256k1(key.point_bytes()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.algorithm(), KeyAlgorithm::Secp256k1);
    }

    #[test]
    fn test_parse_round_trip_nist_p256() {
        let key = TestKeypair::generate_nist_p256().public_key();
        let parsed = ApplicationKey::nist_p256(key.point_bytes()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.algorithm(), KeyAlgorithm::NistP256);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = ApplicationKey::secp256k1(&[0xffu8; 33]).unwrap_err();
        assert!(matches!(err, AuthError::MalformedKey(_)));

        let err = ApplicationKey::nist_p256(b"short").unwrap_err();
        assert!(matches!(err, AuthError::MalformedKey(_)));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let key = TestKeypair::generate_secp256k1().public_key();
        assert_eq!(key.fingerprint(), key.fingerprint());
        assert_eq!(key.fingerprint(), Digest::of_bytes(key.point_bytes()));
    }

    #[test]
    fn test_ct_eq_distinguishes_family() {
        let k1 = TestKeypair::generate_secp256k1().public_key();
        let r1 = TestKeypair::generate_nist_p256().public_key();
        assert!(k1.ct_eq(&k1.clone()));
        assert!(!k1.ct_eq(&r1));
    }

    #[test]
    fn test_serde_round_trip() {
        let key = TestKeypair::generate_nist_p256().public_key();
        let json = serde_json::to_string(&key).unwrap();
        let back: ApplicationKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
