//! Bounded incremental garbage collection.
//!
//! Expired key records and replay records are not deleted when they
//! expire; they are swept a few at a time as a side effect of unrelated
//! write-triggering actions. The per-sweep bound keeps that side effect's
//! cost constant and predictable regardless of table size. Sweeps only
//! ever delete records whose expiry condition already holds, so they
//! cannot fail and never block the action that triggered them.

use crate::registry::KeyRegistry;
use crate::replay::ReplayLog;

/// Sweeps expired records under a per-call bound.
#[derive(Clone, Copy, Debug)]
pub struct GarbageCollector {
    max_records_per_sweep: usize,
}

impl GarbageCollector {
    /// Create a collector removing at most `max_records_per_sweep` records
    /// per table per sweep.
    pub fn new(max_records_per_sweep: usize) -> Self {
        Self {
            max_records_per_sweep,
        }
    }

    /// The per-sweep bound.
    pub fn max_records_per_sweep(&self) -> usize {
        self.max_records_per_sweep
    }

    /// Sweep expired key records.
    pub fn sweep_keys(&self, registry: &mut KeyRegistry, now: i64, grace_secs: i64) -> usize {
        let removed = registry.collect_expired(now, grace_secs, self.max_records_per_sweep);
        if removed > 0 {
            tracing::debug!(removed, "collected expired application keys");
        }
        removed
    }

    /// Sweep expired replay records.
    pub fn sweep_relays(&self, log: &mut ReplayLog, now: i64, expiry_secs: i64) -> usize {
        let removed = log.collect_expired(now, expiry_secs, self.max_records_per_sweep);
        if removed > 0 {
            tracing::debug!(removed, "collected expired relay records");
        }
        removed
    }
}
