//! Error types for the mirroring wire format.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON encoding failed
    #[error("encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// JSON decoding failed
    #[error("decoding failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Message decoded but carries an unusable value
    #[error("invalid data: {0}")]
    InvalidData(String),
}
