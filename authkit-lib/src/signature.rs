//! Recoverable ECDSA signatures over protocol digests.
//!
//! Verification has two modes. *Recover-and-compare* takes an expected key
//! and fails with [`AuthError::SignatureMismatch`] unless recovery from
//! `(digest, signature)` reproduces exactly that key. *Recover-as-identity*
//! takes no expectation: the recovered key is the claimed signer, and the
//! caller must separately establish that this identity is entitled to act
//! (a registry lookup, in the protocol crate). Both are pure functions.

use ecdsa::RecoveryId;
use serde::{Deserialize, Serialize};

use crate::{ApplicationKey, AuthError, Digest, KeyAlgorithm, Result};

/// A compact recoverable signature, tagged with its curve family.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationSignature {
    /// Signature over secp256k1.
    Secp256k1 {
        /// Compact `r || s` bytes.
        #[serde(with = "serde_bytes")]
        bytes: [u8; 64],
        /// Low two recovery bits.
        recovery_id: u8,
    },
    /// Signature over NIST P-256.
    NistP256 {
        /// Compact `r || s` bytes.
        #[serde(with = "serde_bytes")]
        bytes: [u8; 64],
        /// Low two recovery bits.
        recovery_id: u8,
    },
}

impl ApplicationSignature {
    /// The curve family this signature claims.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Secp256k1 { .. } => KeyAlgorithm::Secp256k1,
            Self::NistP256 { .. } => KeyAlgorithm::NistP256,
        }
    }

    /// Recover the signing key implied by `(digest, self)`.
    ///
    /// The recovered key is an unauthenticated *claim* of identity; it
    /// proves possession of the matching private key over this digest and
    /// nothing more.
    pub fn recover(&self, digest: &Digest) -> Result<ApplicationKey> {
        match self {
            Self::Secp256k1 { bytes, recovery_id } => {
                let signature = k256::ecdsa::Signature::from_slice(bytes)
                    .map_err(|err| AuthError::MalformedSignature(err.to_string()))?;
                let recovery_id = decode_recovery_id(*recovery_id)?;
                let key = k256::ecdsa::VerifyingKey::recover_from_prehash(
                    digest.as_bytes(),
                    &signature,
                    recovery_id,
                )
                .map_err(|_| AuthError::SignatureMismatch)?;
                let point = key.to_encoded_point(true);
                let mut out = [0u8; 33];
                out.copy_from_slice(point.as_bytes());
                Ok(ApplicationKey::Secp256k1(out))
            }
            Self::NistP256 { bytes, recovery_id } => {
                let signature = p256::ecdsa::Signature::from_slice(bytes)
                    .map_err(|err| AuthError::MalformedSignature(err.to_string()))?;
                let recovery_id = decode_recovery_id(*recovery_id)?;
                let key = p256::ecdsa::VerifyingKey::recover_from_prehash(
                    digest.as_bytes(),
                    &signature,
                    recovery_id,
                )
                .map_err(|_| AuthError::SignatureMismatch)?;
                let point = key.to_encoded_point(true);
                let mut out = [0u8; 33];
                out.copy_from_slice(point.as_bytes());
                Ok(ApplicationKey::NistP256(out))
            }
        }
    }

    /// Recover and compare against an expected key in constant time.
    ///
    /// A curve-family mismatch between signature and expected key is a
    /// [`AuthError::SignatureMismatch`], not a malformed input: the caller
    /// offered a proof for the wrong key.
    pub fn assert_recovers(&self, digest: &Digest, expected: &ApplicationKey) -> Result<()> {
        if self.algorithm() != expected.algorithm() {
            return Err(AuthError::SignatureMismatch);
        }
        let recovered = self.recover(digest)?;
        if recovered.ct_eq(expected) {
            Ok(())
        } else {
            Err(AuthError::SignatureMismatch)
        }
    }
}

fn decode_recovery_id(byte: u8) -> Result<RecoveryId> {
    RecoveryId::from_byte(byte)
        .ok_or_else(|| AuthError::MalformedSignature(format!("recovery id {byte} out of range")))
}

impl std::fmt::Debug for ApplicationSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (bytes, recovery_id) = match self {
            Self::Secp256k1 { bytes, recovery_id } | Self::NistP256 { bytes, recovery_id } => {
                (bytes, recovery_id)
            }
        };
        write!(
            f,
            "ApplicationSignature({}:{}/{})",
            self.algorithm(),
            hex::encode(bytes),
            recovery_id
        )
    }
}
