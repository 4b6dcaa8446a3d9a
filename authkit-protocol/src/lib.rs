//! # Application-key authorization protocol
//!
//! Accounts on the host ledger register secondary "application keys" and
//! then authorize value transfers and arbitrary relayed actions with those
//! keys instead of native ledger signatures. This crate holds the stateful
//! core: the key registry with its active/revoked/expired lifecycle, the
//! replay-protection log, the oracle-priced fee engine with per-account
//! discounts, bounded incremental garbage collection, and the
//! [`AuthManager`] that composes everything into the public protocol
//! actions.
//!
//! ## Execution model
//!
//! The host ledger executes actions sequentially and deterministically, so
//! every operation here is synchronous and every action either completes
//! atomically or aborts without surviving writes. `AuthManager` takes
//! `&mut self` per action; on a concurrent runtime, wrap each call in a
//! single serializable transaction.

pub mod config;
pub mod digests;
pub mod fees;
pub mod gc;
pub mod manager;
pub mod registry;
pub mod replay;

pub use authkit_lib::{AuthError, Result};
pub use config::ProtocolConfig;
pub use gc::GarbageCollector;
pub use manager::{AuthManager, CleanupReport, Ports};
pub use registry::{ApplicationKeyRecord, KeyRegistry, KeyState};
pub use replay::{RelayedActionRecord, ReplayLog};
