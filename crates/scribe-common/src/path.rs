//! Structured paths into an entity's field tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Root segment under which all field data lives.
pub const FIELDS_SEGMENT: &str = "fields";

/// An ordered sequence of keys identifying a position within an entity's
/// structured document: field id, locale code, then nested object keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path(Vec<SmolStr>);

impl Path {
    /// The empty path, addressing the whole document.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Path to one locale of one field: `fields.<field>.<locale>`.
    pub fn field(field: impl Into<SmolStr>, locale: impl Into<SmolStr>) -> Self {
        Self(vec![FIELDS_SEGMENT.into(), field.into(), locale.into()])
    }

    /// Extend with one more segment.
    pub fn child(&self, segment: impl Into<SmolStr>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The field id this path addresses, if it points into `fields`.
    pub fn field_id(&self) -> Option<&str> {
        match self.0.as_slice() {
            [root, field, ..] if root == FIELDS_SEGMENT => Some(field.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

impl<S: Into<SmolStr>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
