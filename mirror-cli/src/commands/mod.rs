//! CLI command implementations.

pub mod envelope;
pub mod gate;
