//! Envelope - the wire format wrapper for every broadcast.

use serde::{Deserialize, Serialize};

use crate::{EditorState, MessageId, PeerId, WireError};

/// The envelope wraps an editor snapshot with routing metadata.
///
/// `message_id` identifies the logical send: the broadcast channel may hand
/// the same envelope to a receiver more than once, always with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Unique id of this send.
    pub message_id: MessageId,
    /// Process that broadcast the message.
    pub sender_identifier: PeerId,
    /// The editor snapshot.
    #[serde(alias = "state")]
    pub payload: EditorState,
}

impl Envelope {
    /// Create a new envelope for sending, with a fresh message id.
    pub fn new(sender: PeerId, payload: EditorState) -> Self {
        Self {
            message_id: MessageId::new(),
            sender_identifier: sender,
            payload,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }

    /// Deserialize from JSON bytes.
    ///
    /// An envelope with an empty `messageId` is rejected: it cannot be
    /// deduplicated.
    pub fn from_json(bytes: &[u8]) -> Result<Self, WireError> {
        let envelope: Self = serde_json::from_slice(bytes).map_err(WireError::Decode)?;
        if envelope.message_id.as_str().is_empty() {
            return Err(WireError::InvalidData("empty messageId".into()));
        }
        Ok(envelope)
    }
}
