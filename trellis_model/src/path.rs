// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell paths: the root-to-cell position of a cell as a string of child
//! indices.
//!
//! Paths order and compare cells structurally. The root has the empty path;
//! a child's path appends its index below its parent, separated by
//! [`SEPARATOR`]. Prefix comparison of paths is what makes the
//! nearest-common-ancestor walk O(depth).

use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::{CellId, Model};

/// Separator between path components.
pub const SEPARATOR: char = '.';

/// Returns the path for the given cell.
///
/// The path is built from the child indices along the parent chain; the
/// topmost ancestor (normally the model root) contributes nothing.
#[must_use]
pub fn create(model: &Model, cell: CellId) -> String {
    let mut indices = Vec::new();
    let mut current = cell;
    while let Some(parent) = model.parent(current) {
        let index = model.child_index(parent, current).unwrap_or(0);
        indices.push(index);
        current = parent;
    }
    let mut path = String::new();
    for index in indices.iter().rev() {
        if !path.is_empty() {
            path.push(SEPARATOR);
        }
        path.push_str(&index.to_string());
    }
    path
}

/// Returns the path of the parent, or `None` for the empty (root) path.
///
/// The parent of a single-component path is the empty path.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    match path.rfind(SEPARATOR) {
        Some(idx) => Some(&path[..idx]),
        None => Some(""),
    }
}

/// Returns `true` if `path` is `ancestor` itself or lies below it.
#[must_use]
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path[ancestor.len()..].starts_with(SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_nested_paths() {
        assert_eq!(parent("0.1.2"), Some("0.1"));
        assert_eq!(parent("0"), Some(""));
        assert_eq!(parent(""), None);
    }

    #[test]
    fn ancestor_prefix_rules() {
        assert!(is_ancestor("", "0.1"));
        assert!(is_ancestor("0.1", "0.1"));
        assert!(is_ancestor("0.1", "0.1.5"));
        // "0.10" is not below "0.1".
        assert!(!is_ancestor("0.1", "0.10"));
        assert!(!is_ancestor("0.1", "1.1"));
    }
}
