//! Collaborator ports.
//!
//! The protocol core never reads ambient global state: the current time,
//! balances, oracle prices, discount attributes, native authorization, and
//! action dispatch all arrive through these traits. Each is a synchronous,
//! in-process lookup against already-committed state — the host ledger
//! executes actions sequentially, so there is no blocking I/O to model.
//! Deterministic doubles for every port live in [`crate::test_utils`].

use crate::{AccountName, Asset, RelayedAction, Result, Symbol};

/// Source of the current time.
pub trait Clock {
    /// Current unix time in seconds.
    fn unix_now(&self) -> i64;
}

/// Wall-clock time via `chrono`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// The host ledger's native signature/permission check.
///
/// Used only to authorize fee payers and key-registration bootstrap, never
/// ordinary protocol usage — that is the whole point of application keys.
pub trait NativeAuthority {
    /// Fail with [`crate::AuthError::MissingAuthority`] unless the
    /// enclosing transaction carries `account`'s native authorization.
    fn require_auth(&self, account: &AccountName) -> Result<()>;
}

/// The fungible-asset ledger.
pub trait TokenLedger {
    /// Move `quantity` from one account to another.
    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        quantity: &Asset,
        memo: &str,
    ) -> Result<()>;

    /// Mint new supply to an account.
    fn issue(&mut self, to: &AccountName, quantity: &Asset, memo: &str) -> Result<()>;

    /// Burn supply held by the protocol account.
    fn retire(&mut self, quantity: &Asset, memo: &str) -> Result<()>;

    /// Current balance of `account` in `symbol` (zero when no row exists).
    fn balance_of(&self, account: &AccountName, symbol: &Symbol) -> Asset;

    /// Outstanding supply of `symbol`.
    fn supply_of(&self, symbol: &Symbol) -> Asset;

    /// Proportional-reward transfer from `from` into the reward pool.
    fn distribute_reward(&mut self, from: &AccountName, quantity: &Asset) -> Result<()>;
}

/// The price-oracle service.
pub trait PriceOracle {
    /// Most recent consensus price for a named trading pair, or `None`
    /// when the pair is not listed.
    fn price(&self, pair: &str) -> Option<f64>;
}

/// The attribute/identity registry.
pub trait AttributeRegistry {
    /// Value of `name` set by `issuer` on `account`.
    ///
    /// `None` covers never-set, explicitly unset, and issuer-invalidated
    /// attributes alike; all collapse to the default-discount case.
    fn attribute(
        &self,
        issuer: &AccountName,
        account: &AccountName,
        name: &str,
    ) -> Option<Vec<u8>>;
}

/// Hands a relayed action to the host ledger for execution.
pub trait ActionDispatcher {
    /// Dispatch the action; failure aborts the enclosing relay.
    fn dispatch(&mut self, action: &RelayedAction) -> Result<()>;
}
