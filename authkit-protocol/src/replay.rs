//! Replay protection for relayed actions.
//!
//! Every successfully relayed action leaves a fingerprint record behind;
//! any later relay whose digest already has a live record is rejected.
//! Records expire a configurable window after their caller-supplied action
//! timestamp and are removed by the same bounded oldest-first sweep the
//! key registry uses.

use std::collections::{BTreeMap, HashMap};

use authkit_lib::{AuthError, Digest, Result};

/// One executed relayed action.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelayedActionRecord {
    /// Monotonic local identifier.
    pub id: u64,
    /// Digest binding account, payload, timestamp, and authorizing key.
    pub fingerprint: Digest,
    /// Caller-supplied action timestamp; drives expiry and is itself part
    /// of the fingerprint domain.
    pub action_timestamp: i64,
}

/// Table of executed-action fingerprints.
#[derive(Debug, Default)]
pub struct ReplayLog {
    records: BTreeMap<u64, RelayedActionRecord>,
    by_fingerprint: HashMap<Digest, u64>,
    next_id: u64,
}

impl ReplayLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fingerprint unless it already has a live record.
    ///
    /// Check-then-insert is a single step here; the sequential execution
    /// model admits no interleaving between the two.
    pub fn record_if_absent(&mut self, fingerprint: Digest, action_timestamp: i64) -> Result<u64> {
        if self.by_fingerprint.contains_key(&fingerprint) {
            return Err(AuthError::AlreadyExecuted);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.by_fingerprint.insert(fingerprint, id);
        self.records.insert(
            id,
            RelayedActionRecord {
                id,
                fingerprint,
                action_timestamp,
            },
        );
        Ok(id)
    }

    /// Whether a fingerprint currently has a live record.
    pub fn contains(&self, fingerprint: &Digest) -> bool {
        self.by_fingerprint.contains_key(fingerprint)
    }

    /// Remove a record by id; used to unwind a relay whose dispatch failed
    /// after the record was written.
    pub fn remove(&mut self, id: u64) {
        if let Some(record) = self.records.remove(&id) {
            self.by_fingerprint.remove(&record.fingerprint);
        }
    }

    /// Delete expired records oldest-first, stopping at the first record
    /// whose `action_timestamp + expiry` has not yet elapsed or after
    /// `max` removals. Returns the number removed.
    pub fn collect_expired(&mut self, now: i64, expiry_secs: i64, max: usize) -> usize {
        let mut removed = 0;
        while removed < max {
            let id = match self.records.iter().next() {
                Some((&id, record)) if now > record.action_timestamp + expiry_secs => id,
                _ => break,
            };
            self.remove(id);
            removed += 1;
        }
        removed
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
