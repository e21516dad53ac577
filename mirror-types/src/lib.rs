//! # mirror-types
//!
//! Wire format types for IDE editor-state mirroring.
//!
//! Two editor processes broadcast their focus/cursor state to each other.
//! This crate provides the types both sides agree on:
//! - [`MessageId`], [`PeerId`] - Identity types
//! - [`Envelope`] - Message wrapper with routing metadata
//! - [`EditorState`] - The synchronized editor snapshot
//! - [`WireError`] - Error types
//!
//! ## Wire format
//!
//! Messages are JSON objects with camelCase keys. Timestamps are Unix epoch
//! milliseconds taken from the sender's wall clock.
//!
//! ```json
//! {
//!   "messageId": "5c0f4b0e-3f0e-4c55-9d8e-0f2b1f0c7a11",
//!   "senderIdentifier": "vscode-4711",
//!   "payload": {
//!     "action": "navigate",
//!     "filePath": "/ws/app/src/main.ts",
//!     "isActive": true,
//!     "timestamp": 1760000000000,
//!     "cursor": { "line": 12, "column": 4 }
//!   }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod state;

pub use envelope::Envelope;
pub use error::WireError;
pub use ids::{MessageId, PeerId};
pub use state::{now_millis, CursorPosition, EditorAction, EditorState, Selection};
