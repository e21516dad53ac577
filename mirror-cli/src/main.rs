//! # mirror-cli
//!
//! CLI tool for exercising the IDE mirroring message gate.
//!
//! ## Commands
//!
//! - `gate`: Run JSON-lines envelopes through a message gate
//! - `envelope`: Print a freshly stamped envelope
//!
//! ## Example
//!
//! ```bash
//! # Build a message as editor "peerA" would send it
//! mirror-cli envelope --sender peerA --file /ws/a/src/main.rs > msgs.jsonl
//!
//! # Replay it (twice) into editor "peerB", whose workspace is /ws/a
//! cat msgs.jsonl msgs.jsonl | mirror-cli gate --identity peerB --root /ws/a
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{envelope, gate};

/// CLI tool for exercising the IDE mirroring message gate.
#[derive(Parser, Debug)]
#[command(name = "mirror-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log every gate decision (debug level)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run envelopes (one JSON object per line) through a message gate
    Gate {
        /// Identifier of the local editor process
        #[arg(long)]
        identity: String,

        /// Workspace root (repeatable)
        #[arg(long = "root")]
        roots: Vec<String>,

        /// Gate configuration file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Read envelopes from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Print a new envelope as one JSON line
    Envelope {
        /// Identifier of the sending editor process
        #[arg(long, short)]
        sender: String,

        /// Active file (omit for "no file focused")
        #[arg(long, short, default_value = "")]
        file: String,

        /// Mark the sending window as unfocused
        #[arg(long)]
        inactive: bool,

        /// Backdate the timestamp by this many milliseconds
        #[arg(long, default_value = "0")]
        age_ms: u64,

        /// Use a fixed message id instead of a random one
        #[arg(long)]
        id: Option<String>,

        /// Cursor as LINE:COLUMN
        #[arg(long)]
        cursor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| if cli.verbose { "debug" } else { "info" }.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Gate {
            identity,
            roots,
            config,
            input,
        } => {
            gate::run(gate::GateArgs {
                identity,
                roots,
                config,
                input,
            })
            .await?;
        }
        Commands::Envelope {
            sender,
            file,
            inactive,
            age_ms,
            id,
            cursor,
        } => {
            envelope::run(envelope::EnvelopeArgs {
                sender,
                file,
                inactive,
                age_ms,
                id,
                cursor,
            })?;
        }
    }

    Ok(())
}
