//! Operational counters for the gate.

use crate::gate::RejectKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome counters for message handling.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct GateMetrics {
    /// Messages passed to `handle`.
    pub received: AtomicU64,
    /// Messages admitted and forwarded to the sink.
    pub admitted: AtomicU64,
    /// Payloads that failed to parse.
    pub parse_errors: AtomicU64,
    /// Our own broadcasts echoed back.
    pub own_messages: AtomicU64,
    /// Re-deliveries of an already seen id.
    pub duplicates: AtomicU64,
    /// States from a peer window without focus.
    pub inactive: AtomicU64,
    /// States older than the freshness bound.
    pub stale: AtomicU64,
    /// Files outside every workspace root.
    pub out_of_scope: AtomicU64,
    /// Unexpected failures caught at the gate boundary.
    pub internal_errors: AtomicU64,
    /// Admitted states the sink failed to apply.
    pub sink_failures: AtomicU64,
}

/// Point-in-time copy of [`GateMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Messages passed to `handle`.
    pub received: u64,
    /// Messages admitted.
    pub admitted: u64,
    /// Parse failures.
    pub parse_errors: u64,
    /// Own messages dropped.
    pub own_messages: u64,
    /// Duplicates dropped.
    pub duplicates: u64,
    /// Inactive-sender states dropped.
    pub inactive: u64,
    /// Stale states dropped.
    pub stale: u64,
    /// Out-of-scope states dropped.
    pub out_of_scope: u64,
    /// Internal errors.
    pub internal_errors: u64,
    /// Sink failures.
    pub sink_failures: u64,
}

impl MetricsSnapshot {
    /// Total rejected messages across all reasons.
    pub fn rejected(&self) -> u64 {
        self.parse_errors
            + self.own_messages
            + self.duplicates
            + self.inactive
            + self.stale
            + self.out_of_scope
            + self.internal_errors
    }
}

impl GateMetrics {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self, kind: RejectKind) {
        let counter = match kind {
            RejectKind::ParseError => &self.parse_errors,
            RejectKind::OwnMessage => &self.own_messages,
            RejectKind::Duplicate => &self.duplicates,
            RejectKind::SenderInactive => &self.inactive,
            RejectKind::Stale => &self.stale,
            RejectKind::OutOfScope => &self.out_of_scope,
            RejectKind::InternalError => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            own_messages: self.own_messages.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            inactive: self.inactive.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            out_of_scope: self.out_of_scope.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}
