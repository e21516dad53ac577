//! Path normalization and containment.
//!
//! Paths arrive from a peer editor that may run on a different platform, so
//! both `\` and `/` separators and `C:` drive prefixes must compare sanely:
//!
//! - all `\` become `/`
//! - a single trailing `/` is dropped, unless the path is just `/`
//!   (so `C:\` normalizes to `c:`)
//! - a leading drive letter is lower-cased; nothing else is case-folded
//!
//! Case below the drive is preserved because filesystems disagree on case
//! sensitivity there.

/// Normalize a path for comparison.
pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");

    if has_drive_prefix(&normalized) {
        normalized[..1].make_ascii_lowercase();
    }

    if normalized.ends_with('/') && normalized != "/" {
        normalized.pop();
    }

    normalized
}

/// True iff `path` is `root` itself or lies somewhere below it.
///
/// Pure prefix test on normalized forms: `/ws/ab` is not below `/ws/a`.
/// An empty root contains nothing.
pub fn is_descendant_or_equal(path: &str, root: &str) -> bool {
    let root = normalize(root);
    if root.is_empty() {
        return false;
    }
    let path = normalize(path);

    if path == root {
        return true;
    }

    // `/` is the only normalized form that keeps its separator.
    if root == "/" {
        return path.starts_with('/');
    }

    path.len() > root.len() && path.starts_with(&root) && path.as_bytes()[root.len()] == b'/'
}

/// `X:` at the start of the path.
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
