//! Canonical digest construction.
//!
//! Every signature-based protocol action signs the SHA-256 hash of its own
//! arguments in canonical form. The digest is never transmitted: both the
//! signer and the verifier rebuild it independently from the action's
//! arguments, so the byte layout here is a frozen protocol contract. Fields
//! are joined with a single `*` byte inserted between (never after) each
//! pair, and each field is the canonical external representation of its
//! value (an account name as its string bytes, a public key as its raw
//! point bytes, an asset as its decimal string, a timestamp as its decimal
//! unix-seconds string).

use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};

/// Delimiter inserted between adjacent digest fields.
pub const FIELD_DELIMITER: &[u8] = b"*";

/// A 256-bit protocol digest.
///
/// Doubles as the replay-protection fingerprint and as the key fingerprint
/// used for registry lookups by raw key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(#[serde(with = "serde_bytes")] [u8; 32]);

impl Digest {
    /// Hash an ordered field list: `sha256(join(fields, "*"))`.
    ///
    /// Field order and count are part of each action's protocol contract
    /// and must never change without a version bump.
    pub fn of_fields<I, B>(fields: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut payload = Vec::new();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                payload.extend_from_slice(FIELD_DELIMITER);
            }
            payload.extend_from_slice(field.as_ref());
        }
        Self::of_bytes(&payload)
    }

    /// Hash a single byte string without any delimiting.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        Self(out)
    }

    /// Construct from raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
