//! Keyed reactive collection.
//!
//! Tracks live entity collections (open documents, presence sets) by
//! `sys.id` and broadcasts a freshly materialized list on every mutation.
//! Subscribers never see a previously published list mutated in place.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use smol_str::SmolStr;
use tokio::sync::watch;

use scribe_common::HasId;

/// A keyed reactive set over shared items.
///
/// Items are keyed by [`HasId::id`]; the stored order is id-sorted so all
/// peers observe the list deterministically. Removal only takes effect
/// when the caller holds the same `Rc` the set stores.
pub struct LiveSet<T> {
    entries: RefCell<BTreeMap<SmolStr, Rc<T>>>,
    tx: watch::Sender<Vec<Rc<T>>>,
}

impl<T: HasId> LiveSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            entries: RefCell::new(BTreeMap::new()),
            tx,
        }
    }

    /// Subscribe to the current value list. The receiver yields a new
    /// list after every mutating call.
    pub fn items(&self) -> watch::Receiver<Vec<Rc<T>>> {
        self.tx.subscribe()
    }

    /// Insert or replace one item; one broadcast.
    pub fn add(&self, item: Rc<T>) {
        self.entries
            .borrow_mut()
            .insert(SmolStr::new(item.id()), item);
        self.publish();
    }

    /// Insert or replace several items; one broadcast for the whole batch.
    pub fn add_many(&self, items: impl IntoIterator<Item = Rc<T>>) {
        {
            let mut entries = self.entries.borrow_mut();
            for item in items {
                entries.insert(SmolStr::new(item.id()), item);
            }
        }
        self.publish();
    }

    /// Remove `item` if it is the exact object stored under its key.
    ///
    /// A stale reference (same id, different object) is a no-op and does
    /// not broadcast.
    pub fn remove(&self, item: &Rc<T>) {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            match entries.get(item.id()) {
                Some(stored) if Rc::ptr_eq(stored, item) => {
                    entries.remove(item.id());
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.publish();
        }
    }

    /// Replace the whole contents; one broadcast.
    pub fn reset(&self, items: impl IntoIterator<Item = Rc<T>>) {
        {
            let mut entries = self.entries.borrow_mut();
            entries.clear();
            for item in items {
                entries.insert(SmolStr::new(item.id()), item);
            }
        }
        self.publish();
    }

    /// Synchronous lookup by id.
    pub fn get(&self, id: &str) -> Option<Rc<T>> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn publish(&self) {
        let list: Vec<Rc<T>> = self.entries.borrow().values().cloned().collect();
        self.tx.send_replace(list);
    }
}

impl<T: HasId> Default for LiveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
