//! Operations: atomic, composable, invertible mutations of a snapshot.
//!
//! Transform semantics (merging concurrent operations) belong to the OT
//! transport; this layer only applies operations in the exact order they
//! were acknowledged, and records enough to undo them.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::OpError;
use crate::path::Path;
use crate::value;

/// An atomic mutation targeting a path within an entity's field tree.
///
/// Text offsets are character offsets, not byte offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Set the value at a path, creating intermediate objects.
    Set { path: Path, value: serde_json::Value },
    /// Remove the value at a path. Removing a missing value is a no-op.
    Remove { path: Path },
    /// Insert text into the string at a path.
    TextInsert {
        path: Path,
        offset: usize,
        text: SmolStr,
    },
    /// Delete a character range from the string at a path.
    TextDelete {
        path: Path,
        offset: usize,
        len: usize,
    },
}

impl Operation {
    /// The path this operation targets.
    pub fn path(&self) -> &Path {
        match self {
            Operation::Set { path, .. }
            | Operation::Remove { path }
            | Operation::TextInsert { path, .. }
            | Operation::TextDelete { path, .. } => path,
        }
    }

    /// Apply this operation to `root` and return its inverse.
    ///
    /// Applying the returned inverse to the mutated snapshot restores the
    /// prior state exactly.
    pub fn apply(&self, root: &mut serde_json::Value) -> Result<Operation, OpError> {
        match self {
            Operation::Set { path, value } => {
                let prior = value::set_at(root, path, value.clone())?;
                Ok(match prior {
                    Some(value) => Operation::Set {
                        path: path.clone(),
                        value,
                    },
                    None => Operation::Remove { path: path.clone() },
                })
            }

            Operation::Remove { path } => {
                let prior = value::remove_at(root, path)?;
                Ok(match prior {
                    Some(value) => Operation::Set {
                        path: path.clone(),
                        value,
                    },
                    // Removing nothing undoes to removing nothing.
                    None => Operation::Remove { path: path.clone() },
                })
            }

            Operation::TextInsert { path, offset, text } => {
                let target = string_at(root, path)?;
                let at = char_to_byte(target, *offset).ok_or(OpError::OutOfBounds {
                    path: path.clone(),
                    offset: *offset,
                })?;
                target.insert_str(at, text);
                Ok(Operation::TextDelete {
                    path: path.clone(),
                    offset: *offset,
                    len: text.chars().count(),
                })
            }

            Operation::TextDelete { path, offset, len } => {
                let target = string_at(root, path)?;
                let start = char_to_byte(target, *offset).ok_or(OpError::OutOfBounds {
                    path: path.clone(),
                    offset: *offset,
                })?;
                let end = char_to_byte(target, offset + len).ok_or(OpError::OutOfBounds {
                    path: path.clone(),
                    offset: offset + len,
                })?;
                let removed: SmolStr = target[start..end].into();
                target.replace_range(start..end, "");
                Ok(Operation::TextInsert {
                    path: path.clone(),
                    offset: *offset,
                    text: removed,
                })
            }
        }
    }
}

fn string_at<'a>(root: &'a mut serde_json::Value, path: &Path) -> Result<&'a mut String, OpError> {
    match value::get_at_mut(root, path) {
        Some(serde_json::Value::String(s)) => Ok(s),
        _ => Err(OpError::NotText { path: path.clone() }),
    }
}

/// Map a character offset into a byte offset; `Some(len)` at the end of the
/// string, `None` past it.
fn char_to_byte(s: &str, offset: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(offset)
}
