//! Entity metadata shared across the workspace.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The kind of content record an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Entry,
    Asset,
}

/// Server-owned system metadata for an entity.
///
/// The version is authoritative on the server; sessions cache the last
/// acknowledged value and only advance it on server confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sys {
    /// Unique entity identifier.
    pub id: SmolStr,
    /// Last server-confirmed version.
    pub version: u64,
    /// Entry or Asset.
    pub entity_type: EntityType,
}

/// A versioned content record with structured field data.
///
/// `fields` is the field → locale → value tree as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub sys: Sys,
    pub fields: serde_json::Value,
}

impl Entity {
    /// Create an empty entity at version 0.
    pub fn new(id: impl Into<SmolStr>, entity_type: EntityType) -> Self {
        Self {
            sys: Sys {
                id: id.into(),
                version: 0,
                entity_type,
            },
            fields: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Builder-style version setter, mostly useful in tests and fixtures.
    pub fn at_version(mut self, version: u64) -> Self {
        self.sys.version = version;
        self
    }
}

/// Anything keyed by its `sys.id` (entities, sessions, collaborators).
pub trait HasId {
    fn id(&self) -> &str;
}

impl HasId for Entity {
    fn id(&self) -> &str {
        &self.sys.id
    }
}

/// Identity of the user a session acts as. Carried for presence display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollabUser {
    pub id: SmolStr,
    pub display_name: SmolStr,
}

impl CollabUser {
    pub fn new(id: impl Into<SmolStr>, display_name: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

impl HasId for CollabUser {
    fn id(&self) -> &str {
        &self.id
    }
}
