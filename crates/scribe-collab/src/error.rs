//! Error types for document sessions.

use miette::Diagnostic;
use smol_str::SmolStr;

use scribe_common::{OpError, Path};

/// Errors surfaced by the session's editing surface.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[diagnostic(code(scribe::session))]
#[non_exhaustive]
pub enum SessionError {
    /// The session was torn down; further edits would be lost silently
    /// otherwise, so they fail loudly instead.
    #[error("document session has been destroyed")]
    Destroyed,

    /// The path names a field the content type does not define.
    #[error("unknown field `{field}`")]
    UnknownField { field: SmolStr },

    /// The field exists but is not editable.
    #[error("field `{field}` is disabled for editing")]
    DisabledField { field: SmolStr },

    /// The path does not address an editable field value.
    #[error("path `{path}` does not address an editable field value")]
    InvalidPath { path: Path },

    /// A resync was attempted with a different entity.
    #[error("entity `{got}` does not match session entity `{want}`")]
    EntityMismatch { want: SmolStr, got: SmolStr },

    /// An operation failed to apply to the snapshot.
    #[error(transparent)]
    Op(#[from] OpError),
}
