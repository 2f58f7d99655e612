//! Reference-counted registry of open document sessions.
//!
//! Several widgets can bind the same entity at once; the pool makes sure
//! they share one [`DocumentSession`] and that the session is destroyed
//! exactly when the last user disposes it.

use std::cell::RefCell;
use std::collections::HashMap;

use smol_str::SmolStr;

use scribe_common::{CollabUser, ContentType, Entity};

use crate::session::DocumentSession;

struct PoolEntry {
    doc: DocumentSession,
    refs: usize,
}

/// Pool of live sessions, keyed by entity id.
#[derive(Default)]
pub struct DocPool {
    entries: RefCell<HashMap<SmolStr, PoolEntry>>,
}

impl DocPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session for an entity, creating it on first use.
    ///
    /// Repeated calls for the same entity id return the same session and
    /// bump its reference count; `entity` and `content_type` are only
    /// consulted when the session is first created.
    pub fn get_doc(
        &self,
        entity: Entity,
        content_type: ContentType,
        user: CollabUser,
    ) -> DocumentSession {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.get_mut(&entity.sys.id) {
            entry.refs += 1;
            tracing::debug!(id = %entity.sys.id, refs = entry.refs, "reusing pooled session");
            return entry.doc.clone();
        }
        let id = entity.sys.id.clone();
        let doc = DocumentSession::new(entity, content_type, user);
        tracing::debug!(id = %id, "opening pooled session");
        entries.insert(
            id,
            PoolEntry {
                doc: doc.clone(),
                refs: 1,
            },
        );
        doc
    }

    /// Release one reference to a session.
    ///
    /// When the last reference goes, the session is removed from the pool
    /// and destroyed. Disposing a session the pool does not know (already
    /// fully released, or never pooled) is a no-op.
    pub fn dispose(&self, doc: &DocumentSession) {
        let destroyed = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.get_mut(doc.id().as_str()) else {
                tracing::debug!(id = %doc.id(), "dispose of unpooled session ignored");
                return;
            };
            if !entry.doc.ptr_eq(doc) {
                tracing::debug!(id = %doc.id(), "dispose of stale session handle ignored");
                return;
            }
            entry.refs -= 1;
            if entry.refs > 0 {
                tracing::debug!(id = %doc.id(), refs = entry.refs, "released pooled session");
                None
            } else {
                entries.remove(doc.id().as_str()).map(|entry| entry.doc)
            }
        };
        if let Some(doc) = destroyed {
            doc.destroy();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
