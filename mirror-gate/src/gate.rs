//! Inbound message admission.
//!
//! Every message from the broadcast channel runs through a fixed pipeline,
//! stopping at the first stage that rejects it:
//!
//! ```text
//! raw bytes ─► parse ─► own? ─► duplicate? ─► active? ─► fresh? ─► in scope? ─► sink
//! ```
//!
//! The id is recorded in the ledger at the duplicate stage, before the
//! remaining checks run, so a re-delivery racing the original is dropped
//! even if the original is later rejected for another reason.
//!
//! Rejections are ordinary values, not errors. Nothing that happens inside
//! [`MessageGate::handle`] propagates to the transport: collaborator
//! failures are logged, a sink that fails or panics is counted as a sink
//! failure on an admitted state, and any other panic becomes
//! [`Rejection::Internal`].

use crate::cleanup::{panic_message, CleanupHandle};
use crate::clock::{Clock, SystemClock};
use crate::config::{CleanupConfig, GateConfig};
use crate::error::ApplyError;
use crate::ledger::DedupLedger;
use crate::metrics::GateMetrics;
use mirror_core::{RootProvider, WorkspaceScope};
use mirror_types::{EditorState, Envelope, MessageId, PeerId};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Identity of the local editor process.
pub trait LocalIdentity: Send + Sync {
    /// Identifier this process stamps on its own broadcasts.
    fn identifier(&self) -> &str;
}

impl LocalIdentity for PeerId {
    fn identifier(&self) -> &str {
        self.as_str()
    }
}

/// Consumer of admitted editor states.
pub trait StateSink: Send + Sync {
    /// Apply the peer's state to the local editor.
    fn apply(&self, state: &EditorState) -> Result<(), ApplyError>;
}

/// Adapts a closure into a [`StateSink`].
pub struct FnSink<F>(pub F);

impl<F> StateSink for FnSink<F>
where
    F: Fn(&EditorState) -> Result<(), ApplyError> + Send + Sync,
{
    fn apply(&self, state: &EditorState) -> Result<(), ApplyError> {
        (self.0)(state)
    }
}

/// Stable label for each rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// Payload could not be decoded.
    ParseError,
    /// Our own broadcast came back.
    OwnMessage,
    /// Message id already seen.
    Duplicate,
    /// Sending window does not have focus.
    SenderInactive,
    /// Sent too long ago.
    Stale,
    /// File outside every workspace root.
    OutOfScope,
    /// Unexpected failure inside the gate.
    InternalError,
}

impl RejectKind {
    /// Label used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectKind::ParseError => "parse_error",
            RejectKind::OwnMessage => "own_message",
            RejectKind::Duplicate => "duplicate",
            RejectKind::SenderInactive => "sender_inactive",
            RejectKind::Stale => "stale",
            RejectKind::OutOfScope => "out_of_scope",
            RejectKind::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for RejectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Payload could not be decoded.
    #[error("parse error: {reason}")]
    Parse {
        /// Decoder message.
        reason: String,
    },

    /// Sent by this process.
    #[error("own message")]
    OwnMessage,

    /// Message id already in the ledger.
    #[error("duplicate message")]
    Duplicate,

    /// Sender window was not focused.
    #[error("sender inactive")]
    SenderInactive,

    /// Message older than the freshness bound.
    #[error("stale message: {age_ms}ms old")]
    Stale {
        /// Measured age at receipt.
        age_ms: u64,
    },

    /// File outside the local workspace.
    #[error("out of scope: {file_path}")]
    OutOfScope {
        /// The peer's file path.
        file_path: String,
    },

    /// A panic or other unexpected failure.
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong.
        reason: String,
    },
}

impl Rejection {
    /// The stable label for this rejection.
    pub fn kind(&self) -> RejectKind {
        match self {
            Rejection::Parse { .. } => RejectKind::ParseError,
            Rejection::OwnMessage => RejectKind::OwnMessage,
            Rejection::Duplicate => RejectKind::Duplicate,
            Rejection::SenderInactive => RejectKind::SenderInactive,
            Rejection::Stale { .. } => RejectKind::Stale,
            Rejection::OutOfScope { .. } => RejectKind::OutOfScope,
            Rejection::Internal { .. } => RejectKind::InternalError,
        }
    }
}

/// Outcome of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// State passed every filter and was handed to the sink.
    Admitted(EditorState),
    /// State was dropped.
    Rejected(Rejection),
}

impl Decision {
    /// Check if the message was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted(_))
    }

    /// The rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Decision::Admitted(_) => None,
            Decision::Rejected(r) => Some(r),
        }
    }

    /// The rejection label, if any.
    pub fn reject_kind(&self) -> Option<RejectKind> {
        self.rejection().map(Rejection::kind)
    }
}

/// Decides which inbound messages reach the local editor.
pub struct MessageGate {
    identity: Arc<dyn LocalIdentity>,
    scope: WorkspaceScope<Arc<dyn RootProvider>>,
    sink: Arc<dyn StateSink>,
    ledger: Arc<DedupLedger>,
    clock: Arc<dyn Clock>,
    max_age_ms: u64,
    metrics: GateMetrics,
}

impl std::fmt::Debug for MessageGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageGate")
            .field("identity", &self.identity.identifier())
            .field("ledger", &self.ledger)
            .field("max_age_ms", &self.max_age_ms)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl MessageGate {
    /// Create a gate with a fresh ledger and the system clock.
    pub fn new(
        config: &GateConfig,
        identity: Arc<dyn LocalIdentity>,
        roots: Arc<dyn RootProvider>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            identity,
            scope: WorkspaceScope::new(roots),
            sink,
            ledger: Arc::new(DedupLedger::new(&config.ledger)),
            clock: Arc::new(SystemClock),
            max_age_ms: config.freshness.max_age_ms,
            metrics: GateMetrics::default(),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing ledger.
    pub fn with_ledger(mut self, ledger: Arc<DedupLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// The dedup ledger.
    pub fn ledger(&self) -> &Arc<DedupLedger> {
        &self.ledger
    }

    /// Outcome counters.
    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Start the ledger's background cleanup on the gate's clock.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_cleanup(&self, config: CleanupConfig) -> CleanupHandle {
        CleanupHandle::start(Arc::clone(&self.ledger), Arc::clone(&self.clock), config)
    }

    /// Run a raw wire message through the pipeline.
    pub fn handle(&self, raw: &[u8]) -> Decision {
        self.guarded(|| {
            let envelope = parse(raw)?;
            self.admit(envelope)
        })
    }

    /// Run an already decoded envelope through the pipeline.
    pub fn handle_envelope(&self, envelope: Envelope) -> Decision {
        self.guarded(|| self.admit(envelope))
    }

    fn guarded<F>(&self, pipeline: F) -> Decision
    where
        F: FnOnce() -> Result<EditorState, Rejection>,
    {
        self.metrics.record_received();

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(pipeline));

        let decision = match outcome {
            Ok(Ok(state)) => {
                self.deliver(&state);
                Decision::Admitted(state)
            }
            Ok(Err(rejection)) => Decision::Rejected(rejection),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!("Gate internal error: {}", reason);
                Decision::Rejected(Rejection::Internal { reason })
            }
        };

        match &decision {
            Decision::Admitted(_) => self.metrics.record_admitted(),
            Decision::Rejected(r) => self.metrics.record_rejected(r.kind()),
        }
        decision
    }

    fn admit(&self, envelope: Envelope) -> Result<EditorState, Rejection> {
        let Envelope {
            message_id,
            sender_identifier,
            payload,
        } = envelope;

        let result = self.filter(&message_id, &sender_identifier, &payload);
        match result {
            Ok(()) => {
                tracing::debug!("Admitted {} from {}", message_id, sender_identifier);
                Ok(payload)
            }
            Err(rejection) => {
                tracing::debug!(
                    "Rejected {} from {}: {}",
                    message_id,
                    sender_identifier,
                    rejection
                );
                Err(rejection)
            }
        }
    }

    fn filter(
        &self,
        message_id: &MessageId,
        sender: &PeerId,
        payload: &EditorState,
    ) -> Result<(), Rejection> {
        check_origin(sender, self.identity.identifier())?;
        let now = self.clock.now_millis();
        check_duplicate(&self.ledger, message_id, now)?;
        check_active(payload)?;
        check_fresh(payload, now, self.max_age_ms)?;
        check_scope(&self.scope, payload)
    }

    fn deliver(&self, state: &EditorState) {
        let applied = std::panic::catch_unwind(AssertUnwindSafe(|| self.sink.apply(state)));
        match applied {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.metrics.record_sink_failure();
                tracing::warn!("Failed to apply state for {:?}: {}", state.file_path, e);
            }
            Err(payload) => {
                self.metrics.record_sink_failure();
                tracing::error!(
                    "Sink panicked applying {:?}: {}",
                    state.file_path,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn parse(raw: &[u8]) -> Result<Envelope, Rejection> {
    Envelope::from_json(raw).map_err(|e| {
        tracing::warn!("Dropping malformed message ({} bytes): {}", raw.len(), e);
        Rejection::Parse {
            reason: e.to_string(),
        }
    })
}

fn check_origin(sender: &PeerId, local: &str) -> Result<(), Rejection> {
    if sender.as_str() == local {
        return Err(Rejection::OwnMessage);
    }
    Ok(())
}

fn check_duplicate(ledger: &DedupLedger, id: &MessageId, now: u64) -> Result<(), Rejection> {
    if ledger.check_and_record(id, now) {
        Ok(())
    } else {
        Err(Rejection::Duplicate)
    }
}

fn check_active(payload: &EditorState) -> Result<(), Rejection> {
    if payload.is_active {
        Ok(())
    } else {
        Err(Rejection::SenderInactive)
    }
}

/// Timestamps ahead of our clock (negative age) are accepted.
fn check_fresh(payload: &EditorState, now: u64, max_age_ms: u64) -> Result<(), Rejection> {
    match now.checked_sub(payload.timestamp) {
        Some(age_ms) if age_ms >= max_age_ms => Err(Rejection::Stale { age_ms }),
        _ => Ok(()),
    }
}

fn check_scope<P: RootProvider>(
    scope: &WorkspaceScope<P>,
    payload: &EditorState,
) -> Result<(), Rejection> {
    if scope.contains(&payload.file_path) {
        Ok(())
    } else {
        Err(Rejection::OutOfScope {
            file_path: payload.file_path.clone(),
        })
    }
}
