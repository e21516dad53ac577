//! # mirror-gate
//!
//! Inbound message admission for IDE editor-state mirroring.
//!
//! Two editors broadcast their cursor/focus state over a shared local
//! channel. Each side runs a [`MessageGate`] that decides which received
//! states are applied locally:
//! - drops messages we sent ourselves
//! - drops re-deliveries (via the [`DedupLedger`])
//! - drops states from an unfocused peer window
//! - drops states older than the freshness bound
//! - drops states for files outside our workspace roots
//!
//! ## Architecture
//!
//! ```text
//!  transport ──raw bytes──► MessageGate ──EditorState──► StateSink
//!                              │    │
//!                   DedupLedger◄┘    └►WorkspaceScope ◄── RootProvider
//!                       ▲
//!               cleanup task (every 60s)
//! ```
//!
//! `handle` is synchronous and may be called from several transport threads
//! at once; the ledger is the only shared mutable state and is lock-protected.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod metrics;

pub use cleanup::{spawn_cleanup_task, CleanupHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CleanupConfig, ConfigError, FreshnessConfig, GateConfig, LedgerConfig};
pub use error::ApplyError;
pub use gate::{Decision, FnSink, LocalIdentity, MessageGate, RejectKind, Rejection, StateSink};
pub use ledger::DedupLedger;
pub use metrics::{GateMetrics, MetricsSnapshot};
