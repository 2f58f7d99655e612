//! Shared data model and transport boundary for the scribe collaborative core.
//!
//! This crate provides:
//! - Entity and content-type metadata (`Entity`, `Sys`, `ContentType`)
//! - Structured paths into an entity's field tree (`Path`)
//! - Atomic, invertible operations over a snapshot (`Operation`)
//! - The transport boundary consumed by document sessions (`transport`)

pub mod content_type;
pub mod entity;
pub mod error;
pub mod op;
pub mod path;
pub mod transport;
pub mod value;

pub use content_type::{ContentType, FieldDef, FieldType};
pub use entity::{CollabUser, Entity, EntityType, HasId, Sys};
pub use error::OpError;
pub use op::Operation;
pub use path::Path;
