//! Error types for mirror-gate.
//!
//! Filtering outcomes are not errors: they are [`crate::Rejection`] values.
//! Configuration errors live in [`crate::config::ConfigError`]; the type
//! here covers collaborator failures.

/// Failure reported by a [`crate::StateSink`] while applying a state.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The target editor for the file is not open.
    #[error("no editor open for {file_path}")]
    EditorNotOpen {
        /// File the state refers to.
        file_path: String,
    },
}
