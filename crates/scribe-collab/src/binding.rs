//! Per-field adapter handed to UI widgets.
//!
//! A `FieldBinding` narrows a [`DocumentSession`] to one field path so a
//! widget only deals in its own value: read it, write it, clear it, and
//! subscribe to changes without holding path bookkeeping of its own.

use serde_json::Value;

use scribe_common::Path;

use crate::error::SessionError;
use crate::session::{DocumentSession, Subscription};

/// One field path of one document, as seen by a widget.
#[derive(Clone)]
pub struct FieldBinding {
    doc: DocumentSession,
    path: Path,
}

impl FieldBinding {
    /// Bind a field and locale of the session's entity.
    pub fn new(doc: DocumentSession, field: &str, locale: &str) -> Self {
        Self {
            path: Path::field(field, locale),
            doc,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn doc(&self) -> &DocumentSession {
        &self.doc
    }

    /// Current value, if set.
    pub fn get(&self) -> Option<Value> {
        self.doc.get_value(&self.path)
    }

    /// Submit a new value.
    pub fn set(&self, value: Value) -> Result<(), SessionError> {
        self.doc.set_value(self.path.clone(), value)
    }

    /// Remove the value.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.doc.remove_value(self.path.clone())
    }

    /// Subscribe to changes of this field's value.
    ///
    /// The widget must keep the [`Subscription`] exactly as long as it
    /// lives: dropping it early silences updates, keeping it past teardown
    /// leaks the callback and duplicates deliveries on re-bind.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<&Value>) + 'static,
    ) -> Result<Subscription, SessionError> {
        self.doc.on_value_changed(self.path.clone(), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::transport::TransportEvent;
    use scribe_common::{CollabUser, ContentType, Entity, EntityType, FieldDef, FieldType};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn live_session() -> DocumentSession {
        let content_type =
            ContentType::new("post", vec![FieldDef::new("title", FieldType::Symbol)]);
        let doc = DocumentSession::new(
            Entity::new("entry-1", EntityType::Entry).at_version(1),
            content_type,
            CollabUser::new("user-1", "Alice"),
        );
        doc.handle_event(TransportEvent::Connected { version: 1 });
        doc
    }

    #[test]
    fn set_get_clear_roundtrip() {
        let binding = FieldBinding::new(live_session(), "title", "en-US");

        assert_eq!(binding.get(), None);
        binding.set(json!("Hello")).unwrap();
        assert_eq!(binding.get(), Some(json!("Hello")));
        binding.clear().unwrap();
        assert_eq!(binding.get(), None);
    }

    #[test]
    fn unknown_field_fails_on_write() {
        let binding = FieldBinding::new(live_session(), "missing", "en-US");
        assert!(matches!(
            binding.set(json!("x")),
            Err(SessionError::UnknownField { .. })
        ));
    }

    #[test]
    fn rebinding_without_dropping_duplicates_deliveries() {
        let doc = live_session();
        let binding = FieldBinding::new(doc.clone(), "title", "en-US");
        let count = Rc::new(RefCell::new(0u32));

        // A widget that re-subscribes without dropping its old handle
        // hears every change twice.
        let leaked = binding
            .subscribe({
                let count = count.clone();
                move |_| *count.borrow_mut() += 1
            })
            .unwrap();
        let current = binding
            .subscribe({
                let count = count.clone();
                move |_| *count.borrow_mut() += 1
            })
            .unwrap();

        binding.set(json!("one")).unwrap();
        assert_eq!(*count.borrow(), 2);

        // Dropping the stale handle restores single delivery.
        drop(leaked);
        binding.set(json!("two")).unwrap();
        assert_eq!(*count.borrow(), 3);

        drop(current);
        binding.set(json!("three")).unwrap();
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn bindings_on_different_locales_are_independent() {
        let doc = live_session();
        let en = FieldBinding::new(doc.clone(), "title", "en-US");
        let de = FieldBinding::new(doc, "title", "de-DE");

        en.set(json!("Hello")).unwrap();
        assert_eq!(en.get(), Some(json!("Hello")));
        assert_eq!(de.get(), None);
    }
}
