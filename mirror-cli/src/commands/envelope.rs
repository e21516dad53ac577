//! Build a test envelope.

use anyhow::{bail, Context, Result};
use mirror_types::{
    now_millis, CursorPosition, EditorAction, EditorState, Envelope, MessageId, PeerId,
};

/// Arguments for the envelope command.
#[derive(Debug)]
pub struct EnvelopeArgs {
    pub sender: String,
    pub file: String,
    pub inactive: bool,
    pub age_ms: u64,
    pub id: Option<String>,
    pub cursor: Option<String>,
}

/// Run the envelope command.
pub fn run(args: EnvelopeArgs) -> Result<()> {
    let envelope = build(args, now_millis())?;
    println!("{}", envelope.to_json()?);
    Ok(())
}

fn build(args: EnvelopeArgs, now: u64) -> Result<Envelope> {
    let mut state = EditorState::now(EditorAction::Navigate, args.file, !args.inactive)
        .at(now.saturating_sub(args.age_ms));
    if let Some(text) = args.cursor.as_deref() {
        state = state.with_cursor(parse_cursor(text)?);
    }

    let mut envelope = Envelope::new(PeerId::new(args.sender), state);
    if let Some(id) = args.id {
        if id.is_empty() {
            bail!("--id must not be empty");
        }
        envelope.message_id = MessageId::from_string(id);
    }
    Ok(envelope)
}

/// Parse `LINE:COLUMN`.
fn parse_cursor(text: &str) -> Result<CursorPosition> {
    let (line, column) = text
        .split_once(':')
        .with_context(|| format!("cursor must be LINE:COLUMN, got {:?}", text))?;
    let line = line.trim().parse::<u32>().context("invalid cursor line")?;
    let column = column.trim().parse::<u32>().context("invalid cursor column")?;
    Ok(CursorPosition::new(line, column))
}
