//! Protocol configuration.
//!
//! Every time window, bound, and symbol the protocol depends on lives here
//! as a named value so tests can override them instead of fighting magic
//! literals. The defaults reproduce the reference deployment.

use serde::{Deserialize, Serialize};

use authkit_lib::{Asset, Symbol};

const DAY_SECS: i64 = 86_400;

/// Configuration for the protocol actions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// How long a newly registered key stays within its validity window.
    pub key_lifetime_secs: i64,
    /// Grace after `not_valid_after` before a key record may be collected.
    pub key_cleanup_grace_secs: i64,
    /// Grace after expiry during which a key may still be rotated out.
    pub rotation_grace_secs: i64,
    /// How long a replay record outlives its action timestamp.
    pub relay_expiry_secs: i64,
    /// Freshness window for relayed-action timestamps.
    pub relay_freshness_secs: i64,
    /// Upper bound on records removed per garbage-collection sweep.
    pub max_records_per_sweep: usize,
    /// Key storage fee in raw credit units.
    pub key_storage_fee: i64,
    /// The ledger's native asset.
    pub native_symbol: Symbol,
    /// The application credit asset.
    pub credit_symbol: Symbol,
    /// Oracle trading pair quoting the native asset.
    pub price_pair: String,
    /// Attribute-registry name of the per-account discount.
    pub discount_attribute: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            key_lifetime_secs: 360 * DAY_SECS,
            key_cleanup_grace_secs: 180 * DAY_SECS,
            rotation_grace_secs: 30 * DAY_SECS,
            relay_expiry_secs: 30 * DAY_SECS,
            relay_freshness_secs: 3_600,
            max_records_per_sweep: 10,
            key_storage_fee: 1_0000,
            native_symbol: Symbol::new("CORE", 4),
            credit_symbol: Symbol::new("AUTH", 4),
            price_pair: "core.usd".to_string(),
            discount_attribute: "discount".to_string(),
        }
    }
}

impl ProtocolConfig {
    /// The fixed key storage fee as a credit-asset quantity.
    pub fn key_storage_fee_asset(&self) -> Asset {
        Asset::new(self.key_storage_fee, self.credit_symbol.clone())
    }
}
