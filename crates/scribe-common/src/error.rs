//! Error types for snapshot operations.

use miette::Diagnostic;

use crate::path::Path;

/// Errors that can occur while applying an operation to a snapshot.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[diagnostic(code(scribe::op))]
#[non_exhaustive]
pub enum OpError {
    /// A path segment traverses a value that is not an object.
    #[error("path `{path}` passes through a non-object value")]
    PathObstructed { path: Path },

    /// A text operation targeted a value that is not a string.
    #[error("no text value at `{path}`")]
    NotText { path: Path },

    /// A text operation addressed a character offset past the end.
    #[error("offset {offset} out of bounds at `{path}`")]
    OutOfBounds { path: Path, offset: usize },
}
