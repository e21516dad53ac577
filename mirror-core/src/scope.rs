//! Workspace membership for incoming file paths.
//!
//! A state from the peer is only applied when its file lives inside one of
//! our workspace roots. Roots come from the project model and can change at
//! any time (folders added or removed), so they are re-read on every check.

use crate::path::is_descendant_or_equal;
use std::sync::{Arc, RwLock};

/// Source of the local project's workspace roots.
///
/// Implemented by whatever owns the project model. Queried on every scope
/// check; implementations must not assume callers cache the result.
pub trait RootProvider: Send + Sync {
    /// Absolute paths of the current workspace roots.
    fn list_roots(&self) -> Vec<String>;
}

impl RootProvider for Vec<String> {
    fn list_roots(&self) -> Vec<String> {
        self.clone()
    }
}

impl<T: RootProvider + ?Sized> RootProvider for Arc<T> {
    fn list_roots(&self) -> Vec<String> {
        (**self).list_roots()
    }
}

/// Roots that can be replaced while the gate is running.
#[derive(Debug, Default)]
pub struct SharedRoots {
    roots: RwLock<Vec<String>>,
}

impl SharedRoots {
    /// Create a provider seeded with `roots`.
    pub fn new(roots: Vec<String>) -> Self {
        Self {
            roots: RwLock::new(roots),
        }
    }

    /// Replace the whole root set.
    pub fn replace(&self, roots: Vec<String>) {
        let mut guard = self.roots.write().unwrap_or_else(|e| e.into_inner());
        *guard = roots;
    }

    /// Add a single root.
    pub fn add(&self, root: impl Into<String>) {
        let mut guard = self.roots.write().unwrap_or_else(|e| e.into_inner());
        guard.push(root.into());
    }
}

impl RootProvider for SharedRoots {
    fn list_roots(&self) -> Vec<String> {
        self.roots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Is `file_path` inside any of `roots`?
///
/// - empty `file_path` ("no editor focused") is always in scope
/// - no roots means no workspace, so nothing else is in scope
pub fn is_in_scope<S: AsRef<str>>(file_path: &str, roots: &[S]) -> bool {
    if file_path.is_empty() {
        return true;
    }
    roots
        .iter()
        .any(|root| is_descendant_or_equal(file_path, root.as_ref()))
}

/// Scope check bound to a live [`RootProvider`].
#[derive(Debug)]
pub struct WorkspaceScope<P> {
    provider: P,
}

impl<P: RootProvider> WorkspaceScope<P> {
    /// Wrap a root provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Check `file_path` against the provider's current roots.
    pub fn contains(&self, file_path: &str) -> bool {
        if file_path.is_empty() {
            return true;
        }
        let roots = self.provider.list_roots();
        let in_scope = is_in_scope(file_path, &roots);
        if !in_scope {
            tracing::debug!(
                "Path {} outside {} workspace root(s)",
                file_path,
                roots.len()
            );
        }
        in_scope
    }

    /// Access the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}
