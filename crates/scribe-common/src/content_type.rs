//! Content-type field definitions.
//!
//! A session needs just enough schema to interpret an operation path
//! (`fields.<field>.<locale>`) as a typed field value and to refuse edits
//! to fields that don't exist or are disabled for editing.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::entity::HasId;

/// Field value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Symbol,
    Text,
    Integer,
    Number,
    Boolean,
    Object,
    Link,
}

/// A single field definition within a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: SmolStr,
    pub field_type: FieldType,
    /// Whether the field stores one value per locale.
    pub localized: bool,
    /// Disabled fields are visible but not editable.
    pub disabled: bool,
}

impl FieldDef {
    pub fn new(id: impl Into<SmolStr>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            localized: true,
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A content type: an identifier plus its field definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: SmolStr,
    pub fields: Vec<FieldDef>,
}

impl ContentType {
    pub fn new(id: impl Into<SmolStr>, fields: Vec<FieldDef>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a field definition by id.
    pub fn field(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }
}

impl HasId for ContentType {
    fn id(&self) -> &str {
        &self.id
    }
}
