//! Dedup ledger for inbound message ids.
//!
//! Remembers which message ids have already been admitted so re-deliveries
//! from the broadcast channel are dropped. Memory is bounded two ways:
//! - entries older than the retention window are swept by the cleanup task
//! - the ledger never holds more than `capacity` entries, even if the
//!   cleanup task stalls (oldest entries are evicted first)
//!
//! All operations take the same lock, so concurrent deliveries and the
//! background sweep are serialized.

use crate::config::LedgerConfig;
use mirror_types::MessageId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Insertion stamp: receipt time plus a sequence number to keep keys unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Stamp {
    recorded_at: u64,
    seq: u64,
}

#[derive(Debug, Default)]
struct LedgerInner {
    entries: HashMap<MessageId, Stamp>,
    /// Same entries ordered by age, oldest first.
    by_age: BTreeMap<Stamp, MessageId>,
    next_seq: u64,
}

impl LedgerInner {
    fn insert(&mut self, id: MessageId, now: u64) {
        let stamp = Stamp {
            recorded_at: now,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);

        if let Some(old) = self.entries.insert(id.clone(), stamp) {
            self.by_age.remove(&old);
        }
        self.by_age.insert(stamp, id);
    }

    fn expire_older_than(&mut self, cutoff: u64) -> usize {
        let keep = self.by_age.split_off(&Stamp {
            recorded_at: cutoff,
            seq: 0,
        });
        let expired = std::mem::replace(&mut self.by_age, keep);
        for id in expired.values() {
            self.entries.remove(id);
        }
        expired.len()
    }

    fn evict_oldest(&mut self, keep: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > keep {
            match self.by_age.pop_first() {
                Some((_, id)) => {
                    self.entries.remove(&id);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

/// Time-bounded set of recently seen message ids.
#[derive(Debug)]
pub struct DedupLedger {
    retention_ms: u64,
    capacity: usize,
    inner: Mutex<LedgerInner>,
}

impl DedupLedger {
    /// Create an empty ledger from configuration.
    pub fn new(config: &LedgerConfig) -> Self {
        Self::with_limits(config.retention_ms, config.capacity)
    }

    /// Create an empty ledger with explicit limits.
    pub fn with_limits(retention_ms: u64, capacity: usize) -> Self {
        Self {
            retention_ms,
            capacity,
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Whether `id` has been recorded, regardless of its age.
    pub fn seen(&self, id: &MessageId) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Record `id` as seen at `now`, overwriting any earlier receipt time.
    ///
    /// If the ledger grows past capacity, an expiry pass runs before
    /// returning, followed by oldest-first eviction if that was not enough.
    pub fn record(&self, id: MessageId, now: u64) {
        let mut inner = self.lock();
        inner.insert(id, now);
        self.enforce_capacity(&mut inner, now);
    }

    /// Record `id` unless it is already present.
    ///
    /// Returns `true` if the id was new. The check and the insert happen
    /// under one lock, so two concurrent callers with the same id cannot
    /// both get `true`.
    pub fn check_and_record(&self, id: &MessageId, now: u64) -> bool {
        let mut inner = self.lock();
        if inner.entries.contains_key(id) {
            return false;
        }
        inner.insert(id.clone(), now);
        self.enforce_capacity(&mut inner, now);
        true
    }

    /// Remove every entry recorded strictly before `cutoff`.
    ///
    /// Returns the number of entries removed.
    pub fn expire_older_than(&self, cutoff: u64) -> usize {
        self.lock().expire_older_than(cutoff)
    }

    /// Remove every entry older than the retention window as of `now`.
    pub fn expire(&self, now: u64) -> usize {
        self.expire_older_than(self.cutoff(now))
    }

    /// Oldest receipt time that survives an expiry pass at `now`.
    pub fn cutoff(&self, now: u64) -> u64 {
        now.saturating_sub(self.retention_ms)
    }

    /// Number of remembered ids.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Forget everything.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.by_age.clear();
    }

    /// Retention window in milliseconds.
    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }

    /// Maximum number of remembered ids.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn enforce_capacity(&self, inner: &mut LedgerInner, now: u64) {
        if inner.entries.len() <= self.capacity {
            return;
        }

        let expired = inner.expire_older_than(self.cutoff(now));
        let evicted = inner.evict_oldest(self.capacity);
        tracing::debug!(
            "Ledger over capacity ({}): expired {}, evicted {}",
            self.capacity,
            expired,
            evicted
        );
    }

    // The map is consistent between statements, so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new(&LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const RETENTION: u64 = 300_000;

    fn id(s: &str) -> MessageId {
        MessageId::from(s)
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = DedupLedger::default();
        assert!(ledger.is_empty());
        assert_eq!(ledger.capacity(), 1000);
        assert_eq!(ledger.retention_ms(), RETENTION);
    }

    #[test]
    fn recorded_id_is_seen() {
        let ledger = DedupLedger::default();
        assert!(!ledger.seen(&id("m1")));
        ledger.record(id("m1"), 1_000);
        assert!(ledger.seen(&id("m1")));
        assert!(!ledger.seen(&id("m2")));
    }

    #[test]
    fn record_overwrites_timestamp() {
        let ledger = DedupLedger::default();
        ledger.record(id("m1"), 0);
        ledger.record(id("m1"), 500_000);
        assert_eq!(ledger.len(), 1);

        // Old stamp is gone: sweeping at the first timestamp's expiry keeps it
        assert_eq!(ledger.expire_older_than(400_000), 0);
        assert!(ledger.seen(&id("m1")));
    }

    #[test]
    fn seen_ignores_age() {
        let ledger = DedupLedger::default();
        ledger.record(id("old"), 0);
        // No sweep has run, so the entry is still there long after retention
        assert!(ledger.seen(&id("old")));
    }

    #[test]
    fn expiry_boundary() {
        let t = 1_000_000;
        let ledger = DedupLedger::default();
        ledger.record(id("m1"), t);

        // Sweep as of T + 299_999: still inside the window
        assert_eq!(ledger.expire(t + 299_999), 0);
        assert!(ledger.seen(&id("m1")));

        // Cutoff equal to T keeps it (strictly older only)
        assert_eq!(ledger.expire_older_than(t), 0);
        assert!(ledger.seen(&id("m1")));

        // Cutoff past T + 300_000 removes it
        assert_eq!(ledger.expire_older_than(t + RETENTION + 1), 1);
        assert!(!ledger.seen(&id("m1")));
    }

    #[test]
    fn expire_removes_only_old_entries() {
        let ledger = DedupLedger::default();
        ledger.record(id("a"), 100);
        ledger.record(id("b"), 200);
        ledger.record(id("c"), 300);

        assert_eq!(ledger.expire_older_than(250), 2);
        assert!(!ledger.seen(&id("a")));
        assert!(!ledger.seen(&id("b")));
        assert!(ledger.seen(&id("c")));
    }

    #[test]
    fn ledger_never_exceeds_capacity() {
        let ledger = DedupLedger::default();
        for i in 0..1500 {
            ledger.record(MessageId::from_string(format!("m{}", i)), 42);
            assert!(ledger.len() <= 1000, "ledger grew to {}", ledger.len());
        }
        assert_eq!(ledger.len(), 1000);
        // Oldest insertions were evicted first
        assert!(!ledger.seen(&id("m0")));
        assert!(!ledger.seen(&id("m499")));
        assert!(ledger.seen(&id("m500")));
        assert!(ledger.seen(&id("m1499")));
    }

    #[test]
    fn overflow_expires_aged_entries_before_evicting() {
        let ledger = DedupLedger::with_limits(1_000, 3);
        ledger.record(id("old1"), 0);
        ledger.record(id("old2"), 0);
        ledger.record(id("fresh"), 5_000);

        // Fourth insert overflows; both aged entries go, fresh stays
        ledger.record(id("newest"), 5_000);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.seen(&id("fresh")));
        assert!(ledger.seen(&id("newest")));
    }

    #[test]
    fn check_and_record_admits_once() {
        let ledger = DedupLedger::default();
        assert!(ledger.check_and_record(&id("m1"), 10));
        assert!(!ledger.check_and_record(&id("m1"), 20));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn check_and_record_respects_capacity() {
        let ledger = DedupLedger::with_limits(RETENTION, 10);
        for i in 0..25 {
            assert!(ledger.check_and_record(&MessageId::from_string(format!("m{}", i)), 0));
        }
        assert_eq!(ledger.len(), 10);
    }

    #[test]
    fn clear_forgets_everything() {
        let ledger = DedupLedger::default();
        ledger.record(id("m1"), 0);
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.expire_older_than(u64::MAX), 0);
    }

    #[test]
    fn cutoff_saturates_at_zero() {
        let ledger = DedupLedger::default();
        assert_eq!(ledger.cutoff(10), 0);
        assert_eq!(ledger.cutoff(RETENTION + 5), 5);
    }

    #[test]
    fn concurrent_check_and_record_admits_exactly_once() {
        let ledger = Arc::new(DedupLedger::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.check_and_record(&MessageId::from("dup"), 1))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&new| new)
            .count();
        assert_eq!(admitted, 1);
    }
}
