//! Application-key primitives.
//!
//! This crate holds the building blocks of the application-key authorization
//! protocol and intentionally stays stateless: the canonical digest builder,
//! the tagged public-key and recoverable-signature types, fixed-precision
//! asset amounts, the error taxonomy, and the collaborator traits (clock,
//! token ledger, price oracle, attribute registry, native authority, action
//! dispatcher) that the protocol crate consumes through dependency injection.
//!
//! # Example
//!
//! ```
//! use authkit_lib::{AccountName, Digest};
//!
//! let owner = AccountName::new("alice");
//! let digest = Digest::of_fields([owner.as_str().as_bytes(), b"payload".as_slice()]);
//! assert_eq!(digest.as_bytes().len(), 32);
//! ```

pub mod action;
pub mod amount;
pub mod digest;
pub mod errors;
pub mod keys;
pub mod ports;
pub mod signature;

/// Deterministic test doubles for the collaborator ports and signing
/// keypair helpers.
///
/// This module is only available with the `test-utils` feature or in test
/// builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use action::{Permission, RelayedAction};
pub use amount::{Asset, Symbol};
pub use digest::Digest;
pub use errors::AuthError;
pub use keys::{ApplicationKey, KeyAlgorithm};
pub use ports::{
    ActionDispatcher, AttributeRegistry, Clock, NativeAuthority, PriceOracle, SystemClock,
    TokenLedger,
};
pub use signature::ApplicationSignature;

/// Common result alias for protocol operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// A ledger account identifier in its canonical string form.
///
/// The digest builder hashes the string bytes directly, so two names are
/// protocol-equal exactly when their strings are equal.
///
/// # Example
///
/// ```
/// use authkit_lib::AccountName;
///
/// // Create from &str
/// let account: AccountName = "alice".into();
///
/// // Or explicitly
/// let account = AccountName::new("alice");
///
/// assert_eq!(account.as_str(), "alice");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct AccountName(pub String);

impl AccountName {
    /// Create a new account name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the account name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the name is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
