//! EditorState - the editor snapshot carried inside every envelope.

use serde::{Deserialize, Serialize};

/// What the sending editor just did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorAction {
    /// A file was opened.
    Open,
    /// A file was closed.
    Close,
    /// The cursor moved.
    Navigate,
    /// The selection changed.
    Select,
    /// The window gained or lost focus.
    Focus,
    /// Any action this build does not know about.
    #[serde(other)]
    Other,
}

/// Zero-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Zero-based line.
    pub line: u32,
    /// Zero-based column.
    pub column: u32,
}

impl CursorPosition {
    /// Create a new position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A selected range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Anchor of the selection.
    pub start: CursorPosition,
    /// Active end of the selection.
    pub end: CursorPosition,
}

/// Snapshot of the sender's editor.
///
/// Only `file_path`, `is_active` and `timestamp` are inspected on receipt;
/// cursor and selection are passed through to whoever applies the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    /// What happened on the sender.
    #[serde(default = "default_action")]
    pub action: EditorAction,
    /// Absolute path of the active file, empty when no editor is focused.
    #[serde(default)]
    pub file_path: String,
    /// Whether the sending window currently has focus.
    pub is_active: bool,
    /// Send time, Unix epoch milliseconds on the sender's clock.
    pub timestamp: u64,
    /// Primary cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    /// Primary selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

fn default_action() -> EditorAction {
    EditorAction::Other
}

impl EditorState {
    /// Create a state stamped with the current wall-clock time.
    pub fn now(action: EditorAction, file_path: impl Into<String>, is_active: bool) -> Self {
        Self {
            action,
            file_path: file_path.into(),
            is_active,
            timestamp: now_millis(),
            cursor: None,
            selection: None,
        }
    }

    /// Set the cursor position.
    pub fn with_cursor(mut self, cursor: CursorPosition) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Override the send time.
    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Returns 0 if the system clock is before the epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
