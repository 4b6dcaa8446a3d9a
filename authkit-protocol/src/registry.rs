//! The application-key registry.
//!
//! One record per registration, keyed by a monotonically increasing id.
//! A record's life is `Active` → `Revoked` (explicit, one-way) or →
//! expired (purely time-based, no transition), and finally deletion by the
//! bounded garbage-collection sweep once the cleanup grace has passed.
//! Nothing forbids several concurrently active keys per owner, or even
//! duplicate records for the same `(owner, key)` pair; callers treat the
//! first active match in insertion order as authoritative.

use std::collections::BTreeMap;

use authkit_lib::{AccountName, ApplicationKey, AuthError, Result};

/// Revocation state of a key record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KeyState {
    /// Never revoked.
    Active,
    /// Revoked at the given unix time; one-way.
    Revoked {
        /// When the revocation happened.
        at: i64,
    },
}

/// One registered application key.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApplicationKeyRecord {
    /// Monotonic local identifier.
    pub id: u64,
    /// Owning ledger account.
    pub owner: AccountName,
    /// The registered key.
    pub public_key: ApplicationKey,
    /// Start of the validity window (inclusive).
    pub not_valid_before: i64,
    /// End of the validity window (exclusive).
    pub not_valid_after: i64,
    /// Revocation state.
    pub state: KeyState,
}

impl ApplicationKeyRecord {
    /// Whether the record has been revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(self.state, KeyState::Revoked { .. })
    }

    /// Revocation time, if any.
    pub fn revoked_at(&self) -> Option<i64> {
        match self.state {
            KeyState::Active => None,
            KeyState::Revoked { at } => Some(at),
        }
    }

    /// Whether `now` falls inside `[not_valid_before, not_valid_after)`.
    pub fn is_within_window(&self, now: i64) -> bool {
        self.not_valid_before <= now && now < self.not_valid_after
    }

    /// Within the validity window and not revoked.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.is_within_window(now) && !self.is_revoked()
    }
}

/// Table of application-key records.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    records: BTreeMap<u64, ApplicationKeyRecord>,
    next_id: u64,
}

impl KeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record valid for `[now, now + lifetime)`.
    ///
    /// No uniqueness check against existing active keys: multiple
    /// concurrently active keys per owner are legal, duplicates included.
    pub fn register_key(
        &mut self,
        owner: AccountName,
        public_key: ApplicationKey,
        now: i64,
        lifetime_secs: i64,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(
            id,
            ApplicationKeyRecord {
                id,
                owner,
                public_key,
                not_valid_before: now,
                not_valid_after: now + lifetime_secs,
                state: KeyState::Active,
            },
        );
        id
    }

    /// Look up a record by id.
    pub fn get(&self, id: u64) -> Option<&ApplicationKeyRecord> {
        self.records.get(&id)
    }

    /// First active record for `(owner, key)` in insertion order.
    ///
    /// The scan over the owner's key set is linear; the reference protocol
    /// bounds key counts economically (each registration is paid for), not
    /// structurally.
    pub fn find_active(
        &self,
        owner: &AccountName,
        key: &ApplicationKey,
        now: i64,
    ) -> Option<&ApplicationKeyRecord> {
        self.records.values().find(|record| {
            record.owner == *owner && record.public_key == *key && record.is_active_at(now)
        })
    }

    /// First record carrying the key, in insertion order, regardless of
    /// owner or state. Rotation resolves its target this way and applies
    /// its own owner/window checks.
    pub fn find_by_key(&self, key: &ApplicationKey) -> Option<&ApplicationKeyRecord> {
        self.records.values().find(|record| record.public_key == *key)
    }

    /// One-way transition to `Revoked { at }`.
    pub fn revoke(&mut self, id: u64, at: i64) -> Result<()> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| AuthError::InvalidArgument(format!("no key record with id {id}")))?;
        if record.is_revoked() {
            return Err(AuthError::AlreadyRevoked);
        }
        record.state = KeyState::Revoked { at };
        Ok(())
    }

    /// Delete expired records oldest-first, stopping at the first record
    /// whose `not_valid_after + grace` has not yet elapsed or after `max`
    /// removals. Returns the number removed.
    pub fn collect_expired(&mut self, now: i64, grace_secs: i64, max: usize) -> usize {
        let mut removed = 0;
        while removed < max {
            let id = match self.records.iter().next() {
                Some((&id, record)) if now > record.not_valid_after + grace_secs => id,
                _ => break,
            };
            self.records.remove(&id);
            removed += 1;
        }
        removed
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authkit_lib::test_utils::TestKeypair;

    const LIFETIME: i64 = 360 * 86_400;
    const GRACE: i64 = 180 * 86_400;

    fn key() -> ApplicationKey {
        TestKeypair::generate_secp256k1().public_key()
    }

    #[test]
    fn test_register_and_find_active() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        let k = key();

        let id = registry.register_key(alice.clone(), k.clone(), 1_000, LIFETIME);
        let record = registry.find_active(&alice, &k, 1_000).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.revoked_at(), None);
        assert_eq!(record.not_valid_after, 1_000 + LIFETIME);
    }

    #[test]
    fn test_window_is_half_open() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        let k = key();
        registry.register_key(alice.clone(), k.clone(), 1_000, LIFETIME);

        // inclusive start
        assert!(registry.find_active(&alice, &k, 1_000).is_some());
        // exclusive end
        assert!(registry.find_active(&alice, &k, 1_000 + LIFETIME).is_none());
        assert!(registry
            .find_active(&alice, &k, 1_000 + LIFETIME - 1)
            .is_some());
        // before the window
        assert!(registry.find_active(&alice, &k, 999).is_none());
    }

    #[test]
    fn test_expired_key_not_found_but_not_removed() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        let k = key();
        let registered_at = 0;
        registry.register_key(alice.clone(), k.clone(), registered_at, LIFETIME);

        // 361 days later: expired, never revoked
        let day_361 = 361 * 86_400;
        assert!(registry.find_active(&alice, &k, day_361).is_none());
        assert_eq!(registry.len(), 1);

        // only collectable once lifetime + grace has elapsed
        assert_eq!(registry.collect_expired(day_361, GRACE, 10), 0);
        let past_grace = LIFETIME + GRACE + 1;
        assert_eq!(registry.collect_expired(past_grace, GRACE, 10), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_revoke_is_one_way() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        let k = key();
        let id = registry.register_key(alice.clone(), k.clone(), 0, LIFETIME);

        registry.revoke(id, 500).unwrap();
        assert_eq!(registry.get(id).unwrap().revoked_at(), Some(500));
        assert!(registry.find_active(&alice, &k, 600).is_none());

        let err = registry.revoke(id, 700).unwrap_err();
        assert_eq!(err, AuthError::AlreadyRevoked);
        // the first revocation time sticks
        assert_eq!(registry.get(id).unwrap().revoked_at(), Some(500));
    }

    #[test]
    fn test_multiple_active_keys_per_owner() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        let k1 = key();
        let k2 = key();

        let id1 = registry.register_key(alice.clone(), k1.clone(), 0, LIFETIME);
        let id2 = registry.register_key(alice.clone(), k2.clone(), 0, LIFETIME);

        assert_eq!(registry.find_active(&alice, &k1, 10).unwrap().id, id1);
        assert_eq!(registry.find_active(&alice, &k2, 10).unwrap().id, id2);
    }

    #[test]
    fn test_duplicate_records_resolve_to_first_active() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        let k = key();

        let first = registry.register_key(alice.clone(), k.clone(), 0, LIFETIME);
        let second = registry.register_key(alice.clone(), k.clone(), 0, LIFETIME);

        assert_eq!(registry.find_active(&alice, &k, 10).unwrap().id, first);

        registry.revoke(first, 20).unwrap();
        assert_eq!(registry.find_active(&alice, &k, 30).unwrap().id, second);
    }

    #[test]
    fn test_collect_expired_is_bounded_and_oldest_first() {
        let mut registry = KeyRegistry::new();
        let alice: AccountName = "alice".into();
        for _ in 0..15 {
            registry.register_key(alice.clone(), key(), 0, 100);
        }
        // a younger record amid the expired ones stops the sweep early
        registry.register_key(alice.clone(), key(), 1_000_000, LIFETIME);
        for _ in 0..3 {
            registry.register_key(alice.clone(), key(), 0, 100);
        }

        let now = 1_000_000;
        assert_eq!(registry.collect_expired(now, 100, 10), 10);
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.collect_expired(now, 100, 10), 5);
        // ids 15.. remain: the unexpired record shields everything behind it
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.collect_expired(now, 100, 10), 0);
    }

    #[test]
    fn test_find_by_key_ignores_owner_and_state() {
        let mut registry = KeyRegistry::new();
        let k = key();
        let id = registry.register_key("alice".into(), k.clone(), 0, LIFETIME);
        registry.revoke(id, 5).unwrap();

        assert_eq!(registry.find_by_key(&k).unwrap().id, id);
        assert!(registry.find_by_key(&key()).is_none());
    }
}
