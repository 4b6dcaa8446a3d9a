//! Error types for protocol operations.
//!
//! Every failure aborts the enclosing protocol action; nothing here is
//! retried automatically. The variants group into authorization errors,
//! protocol-signature errors, state errors, economic errors, and freshness
//! errors so callers can match on the failure class before resubmitting.

use crate::{AccountName, Asset, Symbol};

/// Comprehensive error type for protocol operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// The enclosing transaction does not carry the account's native
    /// ledger authorization.
    #[error("missing native authority of {0}")]
    MissingAuthority(AccountName),

    /// The key recovered from a signature differs from the expected key,
    /// or the signature's curve family differs from the expected key's.
    #[error("recovered key does not match the expected application key")]
    SignatureMismatch,

    /// Public key bytes do not decode to a point on the named curve.
    #[error("malformed public key: {0}")]
    MalformedKey(String),

    /// Signature bytes or recovery id are not decodable.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The account has no application key that is inside its validity
    /// window and not revoked.
    #[error("account {0} has no active application keys")]
    NoActiveKey(AccountName),

    /// Revocation is one-way; the record was already revoked.
    #[error("application key is already revoked")]
    AlreadyRevoked,

    /// The relayed action's fingerprint already has a live replay record.
    #[error("the action has already been executed")]
    AlreadyExecuted,

    /// The key's validity window (plus any applicable grace) has lapsed.
    #[error("application key expired")]
    KeyExpired,

    /// The relayed action's timestamp falls outside the freshness window.
    #[error("action timestamp expired")]
    StaleTimestamp,

    /// The live price makes the charge exceed the caller's declared limit.
    #[error("current price is above the declared limit")]
    PriceAboveLimit,

    /// The oracle does not list the configured trading pair.
    #[error("price pair {0} does not exist")]
    PriceUnavailable(String),

    /// The oracle price produces a non-positive per-credit price.
    #[error("invalid oracle price")]
    InvalidPrice,

    /// A present discount attribute is malformed or outside `[0, 1]`.
    #[error("attribute value error")]
    AttributeValueError,

    /// The payer's balance cannot cover the required amount.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount the action requires.
        required: Asset,
        /// Balance actually available.
        available: Asset,
    },

    /// The credit-asset path needs outstanding credit supply to retire.
    #[error("no outstanding credit supply")]
    NoOutstandingCredit,

    /// The price ceiling is denominated in neither accepted asset.
    #[error("unavailable payment method: {0}")]
    UnsupportedPaymentSymbol(Symbol),

    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure propagated from the underlying token ledger.
    #[error("ledger error: {0}")]
    Ledger(String),
}
