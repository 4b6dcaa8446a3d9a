//! Deterministic test doubles for the collaborator ports, plus signing
//! keypairs for exercising the recoverable-signature protocol.
//!
//! Every double is a cheaply clonable handle over shared state, so a test
//! can hand one clone to the service under test and keep another to
//! inspect or mutate the collaborator mid-scenario.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    AccountName, ActionDispatcher, ApplicationKey, ApplicationSignature, Asset, AttributeRegistry,
    AuthError, Clock, Digest, NativeAuthority, PriceOracle, RelayedAction, Result, Symbol,
    TokenLedger,
};

enum SecretSigner {
    Secp256k1(k256::ecdsa::SigningKey),
    NistP256(p256::ecdsa::SigningKey),
}

/// A signing keypair for one of the supported curve families.
pub struct TestKeypair {
    secret: SecretSigner,
    public: ApplicationKey,
}

impl TestKeypair {
    /// Generate a random secp256k1 keypair.
    pub fn generate_secp256k1() -> Self {
        let secret = k256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        Self::from_k256(secret)
    }

    /// Generate a random NIST P-256 keypair.
    pub fn generate_nist_p256() -> Self {
        let secret = p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        Self::from_p256(secret)
    }

    /// Deterministic secp256k1 keypair from a 32-byte scalar seed.
    ///
    /// Panics on an invalid scalar (zero, or at least the curve order);
    /// small nonzero byte patterns are always fine.
    pub fn secp256k1_from_seed(seed: [u8; 32]) -> Self {
        let secret = k256::ecdsa::SigningKey::from_slice(&seed).expect("invalid scalar seed");
        Self::from_k256(secret)
    }

    /// Deterministic NIST P-256 keypair from a 32-byte scalar seed.
    pub fn nist_p256_from_seed(seed: [u8; 32]) -> Self {
        let secret = p256::ecdsa::SigningKey::from_slice(&seed).expect("invalid scalar seed");
        Self::from_p256(secret)
    }

    fn from_k256(secret: k256::ecdsa::SigningKey) -> Self {
        let point = secret.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Self {
            secret: SecretSigner::Secp256k1(secret),
            public: ApplicationKey::Secp256k1(bytes),
        }
    }

    fn from_p256(secret: p256::ecdsa::SigningKey) -> Self {
        let point = secret.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Self {
            secret: SecretSigner::NistP256(secret),
            public: ApplicationKey::NistP256(bytes),
        }
    }

    /// The public half.
    pub fn public_key(&self) -> ApplicationKey {
        self.public.clone()
    }

    /// Sign a protocol digest, producing a recoverable signature.
    pub fn sign(&self, digest: &Digest) -> ApplicationSignature {
        match &self.secret {
            SecretSigner::Secp256k1(secret) => {
                let (signature, recovery_id) = secret
                    .sign_prehash_recoverable(digest.as_bytes())
                    .expect("signing a 32-byte prehash cannot fail");
                let mut bytes = [0u8; 64];
                bytes.copy_from_slice(&signature.to_bytes());
                ApplicationSignature::Secp256k1 {
                    bytes,
                    recovery_id: recovery_id.to_byte(),
                }
            }
            SecretSigner::NistP256(secret) => {
                let (signature, recovery_id) = secret
                    .sign_prehash_recoverable(digest.as_bytes())
                    .expect("signing a 32-byte prehash cannot fail");
                let mut bytes = [0u8; 64];
                bytes.copy_from_slice(&signature.to_bytes());
                ApplicationSignature::NistP256 {
                    bytes,
                    recovery_id: recovery_id.to_byte(),
                }
            }
        }
    }
}

/// A clock that only moves when told to.
#[derive(Clone, Default)]
pub struct FixedClock {
    now: Arc<AtomicI64>,
}

impl FixedClock {
    /// Start at the given unix time.
    pub fn at(now: i64) -> Self {
        let clock = Self::default();
        clock.set(now);
        clock
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advance by a span in seconds.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Grants native authority to an explicit set of accounts.
#[derive(Clone, Default)]
pub struct StaticAuthority {
    granted: Arc<Mutex<HashSet<AccountName>>>,
}

impl StaticAuthority {
    /// Authority pre-granted to the listed accounts.
    pub fn allowing<I, A>(accounts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AccountName>,
    {
        let authority = Self::default();
        for account in accounts {
            authority.allow(account);
        }
        authority
    }

    /// Grant authority to one more account.
    pub fn allow(&self, account: impl Into<AccountName>) {
        let mut granted = self.granted.lock().expect("lock poisoned");
        granted.insert(account.into());
    }

    /// Withdraw a previously granted authority.
    pub fn deny(&self, account: &AccountName) {
        let mut granted = self.granted.lock().expect("lock poisoned");
        granted.remove(account);
    }
}

impl NativeAuthority for StaticAuthority {
    fn require_auth(&self, account: &AccountName) -> Result<()> {
        let granted = self.granted.lock().expect("lock poisoned");
        if granted.contains(account) {
            Ok(())
        } else {
            Err(AuthError::MissingAuthority(account.clone()))
        }
    }
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<(AccountName, String), i64>,
    supplies: HashMap<String, i64>,
    transfers: Vec<(AccountName, AccountName, Asset, String)>,
    rewards: Vec<Asset>,
}

/// In-memory token ledger with balances, supply, and a reward pool.
#[derive(Clone)]
pub struct MemoryLedger {
    treasury: AccountName,
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    /// Create a ledger whose `retire` burns from the given treasury
    /// account (the protocol's own account in every scenario).
    pub fn new(treasury: impl Into<AccountName>) -> Self {
        Self {
            treasury: treasury.into(),
            state: Arc::new(Mutex::new(LedgerState::default())),
        }
    }

    /// Credit an account out of thin air, without touching supply.
    pub fn set_balance(&self, account: impl Into<AccountName>, quantity: Asset) {
        let mut state = self.state.lock().expect("lock poisoned");
        state
            .balances
            .insert((account.into(), quantity.symbol().code().to_string()), quantity.amount());
    }

    /// Set the outstanding supply of a symbol directly.
    pub fn set_supply(&self, quantity: Asset) {
        let mut state = self.state.lock().expect("lock poisoned");
        state
            .supplies
            .insert(quantity.symbol().code().to_string(), quantity.amount());
    }

    /// All transfers executed so far, in order.
    pub fn transfers(&self) -> Vec<(AccountName, AccountName, Asset, String)> {
        self.state.lock().expect("lock poisoned").transfers.clone()
    }

    /// All reward distributions so far, in order.
    pub fn rewards(&self) -> Vec<Asset> {
        self.state.lock().expect("lock poisoned").rewards.clone()
    }
}

impl TokenLedger for MemoryLedger {
    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        quantity: &Asset,
        memo: &str,
    ) -> Result<()> {
        if !quantity.is_valid() || !quantity.is_positive() {
            return Err(AuthError::Ledger(format!("invalid quantity {quantity}")));
        }
        let mut state = self.state.lock().expect("lock poisoned");
        let code = quantity.symbol().code().to_string();
        let available = *state
            .balances
            .get(&(from.clone(), code.clone()))
            .unwrap_or(&0);
        if available < quantity.amount() {
            return Err(AuthError::InsufficientFunds {
                required: quantity.clone(),
                available: Asset::new(available, quantity.symbol().clone()),
            });
        }
        *state.balances.entry((from.clone(), code.clone())).or_insert(0) -= quantity.amount();
        *state.balances.entry((to.clone(), code)).or_insert(0) += quantity.amount();
        state
            .transfers
            .push((from.clone(), to.clone(), quantity.clone(), memo.to_string()));
        Ok(())
    }

    fn issue(&mut self, to: &AccountName, quantity: &Asset, _memo: &str) -> Result<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        let code = quantity.symbol().code().to_string();
        *state.supplies.entry(code.clone()).or_insert(0) += quantity.amount();
        *state.balances.entry((to.clone(), code)).or_insert(0) += quantity.amount();
        Ok(())
    }

    fn retire(&mut self, quantity: &Asset, _memo: &str) -> Result<()> {
        let treasury = self.treasury.clone();
        let mut state = self.state.lock().expect("lock poisoned");
        let code = quantity.symbol().code().to_string();
        let held = *state
            .balances
            .get(&(treasury.clone(), code.clone()))
            .unwrap_or(&0);
        if held < quantity.amount() {
            return Err(AuthError::Ledger(format!(
                "cannot retire {quantity}: treasury holds {held}"
            )));
        }
        *state.balances.entry((treasury, code.clone())).or_insert(0) -= quantity.amount();
        *state.supplies.entry(code).or_insert(0) -= quantity.amount();
        Ok(())
    }

    fn balance_of(&self, account: &AccountName, symbol: &Symbol) -> Asset {
        let state = self.state.lock().expect("lock poisoned");
        let amount = *state
            .balances
            .get(&(account.clone(), symbol.code().to_string()))
            .unwrap_or(&0);
        Asset::new(amount, symbol.clone())
    }

    fn supply_of(&self, symbol: &Symbol) -> Asset {
        let state = self.state.lock().expect("lock poisoned");
        let amount = *state.supplies.get(symbol.code()).unwrap_or(&0);
        Asset::new(amount, symbol.clone())
    }

    fn distribute_reward(&mut self, from: &AccountName, quantity: &Asset) -> Result<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        let code = quantity.symbol().code().to_string();
        let held = *state
            .balances
            .get(&(from.clone(), code.clone()))
            .unwrap_or(&0);
        if held < quantity.amount() {
            return Err(AuthError::InsufficientFunds {
                required: quantity.clone(),
                available: Asset::new(held, quantity.symbol().clone()),
            });
        }
        *state.balances.entry((from.clone(), code)).or_insert(0) -= quantity.amount();
        state.rewards.push(quantity.clone());
        Ok(())
    }
}

/// Oracle backed by a fixed pair→price table.
#[derive(Clone, Default)]
pub struct StaticOracle {
    prices: Arc<Mutex<HashMap<String, f64>>>,
}

impl StaticOracle {
    /// Builder-style pair listing.
    pub fn with_pair(self, pair: impl Into<String>, price: f64) -> Self {
        self.set_price(pair, price);
        self
    }

    /// Update or list a pair.
    pub fn set_price(&self, pair: impl Into<String>, price: f64) {
        let mut prices = self.prices.lock().expect("lock poisoned");
        prices.insert(pair.into(), price);
    }

    /// Delist a pair.
    pub fn remove_pair(&self, pair: &str) {
        let mut prices = self.prices.lock().expect("lock poisoned");
        prices.remove(pair);
    }
}

impl PriceOracle for StaticOracle {
    fn price(&self, pair: &str) -> Option<f64> {
        let prices = self.prices.lock().expect("lock poisoned");
        prices.get(pair).copied()
    }
}

/// Attribute registry backed by an in-memory table.
#[derive(Clone, Default)]
pub struct MemoryAttributes {
    values: Arc<Mutex<HashMap<(AccountName, AccountName, String), Vec<u8>>>>,
}

impl MemoryAttributes {
    /// Set a raw attribute value.
    pub fn set(
        &self,
        issuer: impl Into<AccountName>,
        account: impl Into<AccountName>,
        name: impl Into<String>,
        value: Vec<u8>,
    ) {
        let mut values = self.values.lock().expect("lock poisoned");
        values.insert((issuer.into(), account.into(), name.into()), value);
    }

    /// Set a discount attribute in its wire form (f64 little-endian).
    pub fn set_discount(
        &self,
        issuer: impl Into<AccountName>,
        account: impl Into<AccountName>,
        name: impl Into<String>,
        discount: f64,
    ) {
        self.set(issuer, account, name, discount.to_le_bytes().to_vec());
    }

    /// Remove an attribute; covers unset and issuer-invalidated alike.
    pub fn unset(&self, issuer: &AccountName, account: &AccountName, name: &str) {
        let mut values = self.values.lock().expect("lock poisoned");
        values.remove(&(issuer.clone(), account.clone(), name.to_string()));
    }
}

impl AttributeRegistry for MemoryAttributes {
    fn attribute(
        &self,
        issuer: &AccountName,
        account: &AccountName,
        name: &str,
    ) -> Option<Vec<u8>> {
        let values = self.values.lock().expect("lock poisoned");
        values
            .get(&(issuer.clone(), account.clone(), name.to_string()))
            .cloned()
    }
}

/// Dispatcher that records every action and can be told to fail once.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    dispatched: Arc<Mutex<Vec<RelayedAction>>>,
    fail_next: Arc<AtomicBool>,
}

impl RecordingDispatcher {
    /// Every action dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<RelayedAction> {
        self.dispatched.lock().expect("lock poisoned").clone()
    }

    /// Make the next dispatch fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&mut self, action: &RelayedAction) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Ledger("dispatch failed".to_string()));
        }
        let mut dispatched = self.dispatched.lock().expect("lock poisoned");
        dispatched.push(action.clone());
        Ok(())
    }
}
