//! The protocol actions.
//!
//! [`AuthManager`] owns the key registry and replay log and reaches every
//! external collaborator through the injected [`Ports`]. Each public
//! method is one protocol action: it rebuilds the canonical digest for its
//! inputs, verifies or recovers signatures, validates key ownership
//! against the registry, charges the fee engine when the action is
//! chargeable, mutates its tables, and triggers a bounded cleanup sweep.
//!
//! Actions are atomic: every fallible check, including the fee engine's
//! own checks, runs before the first state mutation, so a failure aborts
//! with nothing written. The one exception — a dispatcher failure after
//! the replay record is written — is unwound explicitly.

use rust_decimal::Decimal;
use tracing::{debug, info};

use authkit_lib::{
    AccountName, ActionDispatcher, ApplicationKey, ApplicationSignature, Asset, AttributeRegistry,
    AuthError, Clock, NativeAuthority, PriceOracle, RelayedAction, Result, TokenLedger,
};

use crate::config::ProtocolConfig;
use crate::digests;
use crate::fees;
use crate::gc::GarbageCollector;
use crate::registry::{ApplicationKeyRecord, KeyRegistry};
use crate::replay::ReplayLog;

/// The external collaborators, injected as trait objects.
pub struct Ports {
    /// Source of the current time.
    pub clock: Box<dyn Clock>,
    /// The host ledger's native authorization check.
    pub authority: Box<dyn NativeAuthority>,
    /// The fungible-asset ledger.
    pub ledger: Box<dyn TokenLedger>,
    /// The price oracle.
    pub oracle: Box<dyn PriceOracle>,
    /// The attribute/identity registry.
    pub attributes: Box<dyn AttributeRegistry>,
    /// Hands relayed actions to the host ledger.
    pub dispatcher: Box<dyn ActionDispatcher>,
}

/// Counts returned by an explicit [`AuthManager::cleanup`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Key records removed this sweep.
    pub keys_removed: usize,
    /// Replay records removed this sweep.
    pub relays_removed: usize,
}

/// The application-key authorization service.
pub struct AuthManager {
    account: AccountName,
    config: ProtocolConfig,
    gc: GarbageCollector,
    registry: KeyRegistry,
    replay_log: ReplayLog,
    ports: Ports,
}

impl AuthManager {
    /// Create a service running as `account` on the host ledger.
    pub fn new(account: impl Into<AccountName>, config: ProtocolConfig, ports: Ports) -> Self {
        let gc = GarbageCollector::new(config.max_records_per_sweep);
        Self {
            account: account.into(),
            config,
            gc,
            registry: KeyRegistry::new(),
            replay_log: ReplayLog::new(),
            ports,
        }
    }

    /// The service's own ledger account.
    pub fn account(&self) -> &AccountName {
        &self.account
    }

    /// The active configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Read access to the key registry.
    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Read access to the replay log.
    pub fn replay_log(&self) -> &ReplayLog {
        &self.replay_log
    }

    /// First active record for `(owner, key)` at the current time.
    pub fn find_active(
        &self,
        owner: &AccountName,
        key: &ApplicationKey,
    ) -> Result<&ApplicationKeyRecord> {
        let now = self.ports.clock.unix_now();
        self.registry
            .find_active(owner, key, now)
            .ok_or_else(|| AuthError::NoActiveKey(owner.clone()))
    }

    /// Register a new application key under the owner's native authority.
    ///
    /// The caller proves native authority over `account` (and the payer,
    /// when one is named) and possession of the new key via a signature
    /// over the digest of `(account, key, payer)` — the payer field is the
    /// literal payer argument, empty when omitted. Charges the storage
    /// fee, then sweeps expired key records.
    pub fn register_key_by_owner(
        &mut self,
        account: &AccountName,
        pub_key: &ApplicationKey,
        signed_by_key: &ApplicationSignature,
        price_limit: &Asset,
        payer: Option<&AccountName>,
    ) -> Result<u64> {
        let payer_name = payer.unwrap_or(account);
        self.ports.authority.require_auth(account)?;
        self.ports.authority.require_auth(payer_name)?;

        let digest = digests::registration_digest(account, pub_key, payer);
        signed_by_key.assert_recovers(&digest, pub_key)?;

        self.charge_storage_fee(payer_name, price_limit)?;

        let now = self.ports.clock.unix_now();
        let id = self.registry.register_key(
            account.clone(),
            pub_key.clone(),
            now,
            self.config.key_lifetime_secs,
        );
        info!(account = %account, id, "registered application key by owner");
        self.gc
            .sweep_keys(&mut self.registry, now, self.config.key_cleanup_grace_secs);
        Ok(id)
    }

    /// Register a new application key authorized by an existing one.
    ///
    /// No native authority over `account` is needed — only over the payer,
    /// when one is named. Two signatures over the digest of `(account, new
    /// key, existing key, payer)` prove possession of the new key and of
    /// an already-registered key that must still be active for `account`.
    pub fn register_key_by_app(
        &mut self,
        account: &AccountName,
        new_pub_key: &ApplicationKey,
        signed_by_new_key: &ApplicationSignature,
        pub_key: &ApplicationKey,
        signed_by_key: &ApplicationSignature,
        price_limit: &Asset,
        payer: Option<&AccountName>,
    ) -> Result<u64> {
        if let Some(payer) = payer {
            self.ports.authority.require_auth(payer)?;
        }
        let payer_name = payer.unwrap_or(account).clone();

        let digest = digests::co_registration_digest(account, new_pub_key, pub_key, payer);
        signed_by_new_key.assert_recovers(&digest, new_pub_key)?;
        signed_by_key.assert_recovers(&digest, pub_key)?;
        self.require_app_auth(account, pub_key)?;

        self.charge_storage_fee(&payer_name, price_limit)?;

        let now = self.ports.clock.unix_now();
        let id = self.registry.register_key(
            account.clone(),
            new_pub_key.clone(),
            now,
            self.config.key_lifetime_secs,
        );
        info!(account = %account, id, "registered application key by existing key");
        self.gc
            .sweep_keys(&mut self.registry, now, self.config.key_cleanup_grace_secs);
        Ok(id)
    }

    /// Replace an application key with a new one in a single action.
    ///
    /// Same digest and double-signature shape as
    /// [`Self::register_key_by_app`], but the old key's record is revoked
    /// as the new one is registered. The old key is located by its raw key
    /// bytes, must belong to `account`, must not be revoked, and is
    /// accepted up to the rotation grace past its expiry.
    pub fn rotate_key(
        &mut self,
        account: &AccountName,
        new_pub_key: &ApplicationKey,
        signed_by_new_key: &ApplicationSignature,
        pub_key: &ApplicationKey,
        signed_by_key: &ApplicationSignature,
        price_limit: &Asset,
        payer: Option<&AccountName>,
    ) -> Result<u64> {
        if let Some(payer) = payer {
            self.ports.authority.require_auth(payer)?;
        }
        let payer_name = payer.unwrap_or(account).clone();

        let digest = digests::co_registration_digest(account, new_pub_key, pub_key, payer);
        signed_by_new_key.assert_recovers(&digest, new_pub_key)?;
        signed_by_key.assert_recovers(&digest, pub_key)?;

        let now = self.ports.clock.unix_now();
        let old = self
            .registry
            .find_by_key(pub_key)
            .ok_or_else(|| AuthError::NoActiveKey(account.clone()))?;
        if old.owner != *account {
            return Err(AuthError::InvalidArgument(
                "owner of the key does not match the account".to_string(),
            ));
        }
        if old.is_revoked() {
            return Err(AuthError::AlreadyRevoked);
        }
        let replace_deadline = old.not_valid_after + self.config.rotation_grace_secs;
        if !(old.not_valid_before <= now && now < replace_deadline) {
            return Err(AuthError::KeyExpired);
        }
        let old_id = old.id;

        self.charge_storage_fee(&payer_name, price_limit)?;

        self.registry.revoke(old_id, now)?;
        let id = self.registry.register_key(
            account.clone(),
            new_pub_key.clone(),
            now,
            self.config.key_lifetime_secs,
        );
        info!(account = %account, old_id, id, "rotated application key");
        self.gc
            .sweep_keys(&mut self.registry, now, self.config.key_cleanup_grace_secs);
        Ok(id)
    }

    /// Revoke an active key under the owner's native authority.
    pub fn revoke_by_owner(
        &mut self,
        account: &AccountName,
        revoke_pub_key: &ApplicationKey,
    ) -> Result<()> {
        self.ports.authority.require_auth(account)?;
        let id = self.require_app_auth(account, revoke_pub_key)?;

        let now = self.ports.clock.unix_now();
        self.registry.revoke(id, now)?;
        info!(account = %account, id, "revoked application key by owner");
        Ok(())
    }

    /// Revoke an active key, authorized by another active key.
    ///
    /// The authorizing key signs the digest of `(account, key-to-revoke,
    /// authorizing key)`. A key may authorize its own revocation.
    pub fn revoke_by_app(
        &mut self,
        account: &AccountName,
        revoke_pub_key: &ApplicationKey,
        pub_key: &ApplicationKey,
        signed_by_key: &ApplicationSignature,
    ) -> Result<()> {
        let digest = digests::revocation_digest(account, revoke_pub_key, pub_key);
        signed_by_key.assert_recovers(&digest, pub_key)?;

        let target_id = self.require_app_auth(account, revoke_pub_key)?;
        self.require_app_auth(account, pub_key)?;

        let now = self.ports.clock.unix_now();
        self.registry.revoke(target_id, now)?;
        info!(account = %account, id = target_id, "revoked application key by existing key");
        Ok(())
    }

    /// Execute an arbitrary ledger action authorized by an application key.
    ///
    /// The action's own authorization must name exactly one permission
    /// whose actor is `account`; the timestamp must be fresher than the
    /// freshness window; the digest of `(account, action, timestamp, key)`
    /// must not have been executed before. On success the replay log
    /// records the digest, the action is dispatched, and expired replay
    /// records are swept.
    pub fn relay_action(
        &mut self,
        account: &AccountName,
        action: &RelayedAction,
        action_timestamp: i64,
        pub_key: &ApplicationKey,
        signature: &ApplicationSignature,
    ) -> Result<()> {
        let permission = match action.authorization.as_slice() {
            [permission] => permission,
            _ => {
                return Err(AuthError::InvalidArgument(
                    "action authorization should contain exactly one permission".to_string(),
                ))
            }
        };
        if permission.actor != *account {
            return Err(AuthError::MissingAuthority(account.clone()));
        }

        let now = self.ports.clock.unix_now();
        if action_timestamp <= now - self.config.relay_freshness_secs {
            return Err(AuthError::StaleTimestamp);
        }

        let digest = digests::relay_digest(account, action, action_timestamp, pub_key);
        signature.assert_recovers(&digest, pub_key)?;
        self.require_app_auth(account, pub_key)?;

        let record_id = self.replay_log.record_if_absent(digest, action_timestamp)?;
        if let Err(err) = self.ports.dispatcher.dispatch(action) {
            // dispatch failed after the record landed; unwind it so the
            // caller can resubmit
            self.replay_log.remove(record_id);
            return Err(err);
        }
        debug!(account = %account, action = %action.name, "relayed signed action");
        self.gc
            .sweep_relays(&mut self.replay_log, now, self.config.relay_expiry_secs);
        Ok(())
    }

    /// Transfer ledger assets authorized by an application key.
    ///
    /// No replay record is created: the underlying ledger's own transfer
    /// semantics provide idempotency at the transaction level.
    pub fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        quantity: &Asset,
        memo: &str,
        pub_key: &ApplicationKey,
        signed_by_key: &ApplicationSignature,
    ) -> Result<()> {
        if !quantity.is_valid() || !quantity.is_positive() {
            return Err(AuthError::InvalidArgument(format!(
                "invalid quantity {quantity}"
            )));
        }

        let digest = digests::transfer_digest(from, to, quantity, memo, pub_key);
        signed_by_key.assert_recovers(&digest, pub_key)?;
        self.require_app_auth(from, pub_key)?;

        self.ports.ledger.transfer(from, to, quantity, memo)?;
        debug!(from = %from, to = %to, quantity = %quantity, "transferred by application key");
        Ok(())
    }

    /// Purchase application credit at the current oracle price.
    ///
    /// `max_price` is the highest acceptable per-credit price; the action
    /// fails when the live price is not strictly below it. The purchase
    /// fee is the discounted native-asset cost of `quantity`; credit is
    /// issued and handed over 1:1 with the requested quantity.
    pub fn purchase_credit(
        &mut self,
        account: &AccountName,
        quantity: &Asset,
        max_price: f64,
    ) -> Result<()> {
        self.ports.authority.require_auth(account)?;
        if !quantity.is_valid() {
            return Err(AuthError::InvalidArgument(format!(
                "invalid quantity {quantity}"
            )));
        }
        if !quantity.is_positive() {
            return Err(AuthError::InvalidArgument(
                "quantity should be a positive value".to_string(),
            ));
        }
        if *quantity.symbol() != self.config.credit_symbol {
            return Err(AuthError::InvalidArgument(
                "symbol precision mismatch".to_string(),
            ));
        }
        if max_price <= 0.0 {
            return Err(AuthError::InvalidArgument(
                "maximum price should be a positive value".to_string(),
            ));
        }

        let price = self
            .ports
            .oracle
            .price(&self.config.price_pair)
            .ok_or_else(|| AuthError::PriceUnavailable(self.config.price_pair.clone()))?;
        if max_price <= price {
            return Err(AuthError::PriceAboveLimit);
        }
        let unit_price = fees::unit_price(price)?;
        let discount = self.account_discount(account)?;
        let fee_raw = fees::discounted_charge(quantity.amount(), unit_price, discount);
        let fee = Asset::new(fee_raw, self.config.native_symbol.clone());

        self.ports
            .ledger
            .transfer(account, &self.account, &fee, "credit purchase fee")?;
        self.ports
            .ledger
            .issue(&self.account, quantity, "credit purchase")?;
        self.ports
            .ledger
            .transfer(&self.account, account, quantity, "credit purchase")?;
        info!(account = %account, quantity = %quantity, fee = %fee, "purchased application credit");
        Ok(())
    }

    /// Run both garbage-collection sweeps.
    ///
    /// Also triggered implicitly by the charging and relay actions; this
    /// entry point exists so housekeeping can proceed without protocol
    /// traffic.
    pub fn cleanup(&mut self) -> CleanupReport {
        let now = self.ports.clock.unix_now();
        let keys_removed =
            self.gc
                .sweep_keys(&mut self.registry, now, self.config.key_cleanup_grace_secs);
        let relays_removed =
            self.gc
                .sweep_relays(&mut self.replay_log, now, self.config.relay_expiry_secs);
        CleanupReport {
            keys_removed,
            relays_removed,
        }
    }

    /// Record id of the first active key for `(account, key)`, or
    /// [`AuthError::NoActiveKey`].
    fn require_app_auth(&self, account: &AccountName, key: &ApplicationKey) -> Result<u64> {
        let now = self.ports.clock.unix_now();
        self.registry
            .find_active(account, key, now)
            .map(|record| record.id)
            .ok_or_else(|| AuthError::NoActiveKey(account.clone()))
    }

    /// Charge the key storage fee to `payer`, bounded by `price_limit`.
    ///
    /// The limit's denomination picks the payment path. Native path: the
    /// oracle-priced, discounted charge must be strictly below the limit;
    /// the payer is debited and the books then count the fee as credit
    /// supply and the charge as native reserve for the reward computation.
    /// Credit path: the fixed unit cost is debited undiscounted and
    /// retired against outstanding supply. Both paths end by paying the
    /// reward pool its proportional share of the native reserve.
    fn charge_storage_fee(&mut self, payer: &AccountName, price_limit: &Asset) -> Result<()> {
        let pay_with_credit = *price_limit.symbol() == self.config.credit_symbol;
        let pay_with_native = *price_limit.symbol() == self.config.native_symbol;
        if !pay_with_credit && !pay_with_native {
            return Err(AuthError::UnsupportedPaymentSymbol(
                price_limit.symbol().clone(),
            ));
        }
        if !price_limit.is_valid() || !price_limit.is_positive() {
            return Err(AuthError::InvalidArgument(format!(
                "invalid price limit {price_limit}"
            )));
        }

        let fee = self.config.key_storage_fee_asset();
        let credit_supply = self.ports.ledger.supply_of(&self.config.credit_symbol);
        let native_reserve = self
            .ports
            .ledger
            .balance_of(&self.account, &self.config.native_symbol);

        if pay_with_native {
            let price = self
                .ports
                .oracle
                .price(&self.config.price_pair)
                .ok_or_else(|| AuthError::PriceUnavailable(self.config.price_pair.clone()))?;
            let unit_price = fees::unit_price(price)?;
            let discount = self.account_discount(payer)?;
            let charge_raw = fees::discounted_charge(fee.amount(), unit_price, discount);
            let charge = Asset::new(charge_raw, self.config.native_symbol.clone());
            if charge.amount() >= price_limit.amount() {
                return Err(AuthError::PriceAboveLimit);
            }

            // no credit changes hands on this path, but the reward still
            // prices the books as if the fee had entered supply
            let supply_after = credit_supply.amount() + fee.amount();
            let reserve_after = native_reserve.amount() + charge.amount();
            let reward_raw = fees::proportional_reward(fee.amount(), reserve_after, supply_after);

            self.ports
                .ledger
                .transfer(payer, &self.account, &charge, "application key storage fee")?;
            self.distribute_reward(reward_raw)?;
            debug!(payer = %payer, charge = %charge, "charged key storage fee in native asset");
        } else {
            if !credit_supply.is_positive() {
                return Err(AuthError::NoOutstandingCredit);
            }
            // cost already denominated in credit units; no discount
            let reward_raw = fees::proportional_reward(
                fee.amount(),
                native_reserve.amount(),
                credit_supply.amount(),
            );
            if reward_raw > native_reserve.amount() {
                return Err(AuthError::InsufficientFunds {
                    required: Asset::new(reward_raw, self.config.native_symbol.clone()),
                    available: native_reserve,
                });
            }

            self.ports
                .ledger
                .transfer(payer, &self.account, &fee, "application key storage fee")?;
            self.ports.ledger.retire(&fee, "application key storage")?;
            self.distribute_reward(reward_raw)?;
            debug!(payer = %payer, fee = %fee, "charged key storage fee in credit");
        }
        Ok(())
    }

    fn distribute_reward(&mut self, reward_raw: i64) -> Result<()> {
        if reward_raw <= 0 {
            return Ok(());
        }
        let reward = Asset::new(reward_raw, self.config.native_symbol.clone());
        self.ports.ledger.distribute_reward(&self.account, &reward)
    }

    fn account_discount(&self, account: &AccountName) -> Result<Decimal> {
        let value = self.ports.attributes.attribute(
            &self.account,
            account,
            &self.config.discount_attribute,
        );
        fees::parse_discount(value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authkit_lib::test_utils::{
        FixedClock, MemoryAttributes, MemoryLedger, RecordingDispatcher, StaticAuthority,
        StaticOracle, TestKeypair,
    };
    use authkit_lib::Symbol;

    const SERVICE: &str = "app.auth";

    fn manager_with(authority: StaticAuthority, ledger: MemoryLedger) -> AuthManager {
        let ports = Ports {
            clock: Box::new(FixedClock::at(1_000_000)),
            authority: Box::new(authority),
            ledger: Box::new(ledger),
            oracle: Box::new(StaticOracle::default().with_pair("core.usd", 0.003210)),
            attributes: Box::new(MemoryAttributes::default()),
            dispatcher: Box::new(RecordingDispatcher::default()),
        };
        AuthManager::new(SERVICE, ProtocolConfig::default(), ports)
    }

    fn core(amount: i64) -> Asset {
        Asset::new(amount, Symbol::new("CORE", 4))
    }

    #[test]
    fn test_register_requires_native_authority() {
        let ledger = MemoryLedger::new(SERVICE);
        let mut manager = manager_with(StaticAuthority::default(), ledger);
        let pair = TestKeypair::generate_secp256k1();
        let alice: AccountName = "alice".into();

        let digest = digests::registration_digest(&alice, &pair.public_key(), None);
        let err = manager
            .register_key_by_owner(
                &alice,
                &pair.public_key(),
                &pair.sign(&digest),
                &core(500_0000),
                None,
            )
            .unwrap_err();
        assert_eq!(err, AuthError::MissingAuthority(alice));
    }

    #[test]
    fn test_unsupported_payment_symbol() {
        let ledger = MemoryLedger::new(SERVICE);
        let authority = StaticAuthority::allowing(["alice"]);
        let mut manager = manager_with(authority, ledger.clone());
        ledger.set_balance("alice", core(1_000_0000));
        let pair = TestKeypair::generate_secp256k1();
        let alice: AccountName = "alice".into();

        let digest = digests::registration_digest(&alice, &pair.public_key(), None);
        let err = manager
            .register_key_by_owner(
                &alice,
                &pair.public_key(),
                &pair.sign(&digest),
                &Asset::new(10_0000, Symbol::new("OTHER", 4)),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedPaymentSymbol(_)));
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn test_failed_fee_leaves_no_record() {
        // ceiling below the live charge: the registration must not land
        let ledger = MemoryLedger::new(SERVICE);
        let authority = StaticAuthority::allowing(["alice"]);
        let mut manager = manager_with(authority, ledger.clone());
        ledger.set_balance("alice", core(1_000_0000));
        let pair = TestKeypair::generate_secp256k1();
        let alice: AccountName = "alice".into();

        let digest = digests::registration_digest(&alice, &pair.public_key(), None);
        let err = manager
            .register_key_by_owner(
                &alice,
                &pair.public_key(),
                &pair.sign(&digest),
                &core(100_0000),
                None,
            )
            .unwrap_err();
        assert_eq!(err, AuthError::PriceAboveLimit);
        assert!(manager.registry().is_empty());
        assert_eq!(
            ledger
                .balance_of(&alice, &Symbol::new("CORE", 4))
                .amount(),
            1_000_0000
        );
    }
}
