//! Run envelopes through a message gate.

use anyhow::{Context, Result};
use mirror_gate::{ApplyError, Decision, GateConfig, MessageGate, StateSink};
use mirror_types::{EditorState, PeerId};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Arguments for the gate command.
#[derive(Debug)]
pub struct GateArgs {
    pub identity: String,
    pub roots: Vec<String>,
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
}

/// Stands in for the editor: logs what would be applied.
struct LogSink;

impl StateSink for LogSink {
    fn apply(&self, state: &EditorState) -> Result<(), ApplyError> {
        tracing::info!(
            "Apply {:?} {:?} cursor={:?}",
            state.action,
            state.file_path,
            state.cursor
        );
        Ok(())
    }
}

/// One output line per input line.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct DecisionLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl DecisionLine {
    fn new(raw: &str, decision: &Decision) -> Self {
        let message_id = serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(|v| v.get("messageId")?.as_str().map(str::to_string));

        match decision {
            Decision::Admitted(_) => Self {
                message_id,
                decision: "admitted",
                reason: None,
                detail: None,
            },
            Decision::Rejected(rejection) => Self {
                message_id,
                decision: "rejected",
                reason: Some(rejection.kind().as_str()),
                detail: Some(rejection.to_string()),
            },
        }
    }
}

/// Run the gate command.
pub async fn run(args: GateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => GateConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GateConfig::default(),
    };

    if args.roots.is_empty() {
        tracing::warn!("No --root given: every message with a file path will be out of scope");
    }

    let gate = MessageGate::new(
        &config,
        Arc::new(PeerId::new(args.identity)),
        Arc::new(args.roots),
        Arc::new(LogSink),
    );
    let cleanup = gate.start_cleanup(config.cleanup.clone());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut stdout = tokio::io::stdout();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if line.trim().is_empty() {
            continue;
        }
        let decision = gate.handle(line.as_bytes());
        let mut out = serde_json::to_string(&DecisionLine::new(&line, &decision))?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
    }
    stdout.flush().await?;

    cleanup.shutdown().await;

    let snapshot = gate.metrics().snapshot();
    tracing::info!(
        "Processed {} messages: {} admitted, {} rejected ({} remembered ids)",
        snapshot.received,
        snapshot.admitted,
        snapshot.rejected(),
        gate.ledger().len()
    );
    eprintln!("{}", serde_json::to_string(&snapshot)?);

    Ok(())
}
