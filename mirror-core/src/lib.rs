//! # mirror-core
//!
//! Pure logic for IDE editor-state mirroring (no I/O, instant tests).
//!
//! ## Design Philosophy
//!
//! Everything here is a string computation. Deciding whether a peer's file
//! lies inside our workspace never touches the filesystem: the peer may run
//! on another OS, and the file may not exist locally yet. This keeps the
//! checks deterministic and host-portable.
//!
//! - [`path`] - separator/drive-letter normalization and prefix containment
//! - [`scope`] - multi-root workspace membership

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod path;
pub mod scope;

pub use path::{is_descendant_or_equal, normalize};
pub use scope::{is_in_scope, RootProvider, SharedRoots, WorkspaceScope};
