//! Per-entity OT document session.
//!
//! A `DocumentSession` wraps the transport-facing side of one entity's
//! collaborative edit state: a live snapshot of its field data, the cached
//! server version, the queue of unacknowledged local operations, and a
//! path-keyed change broadcast consumed by bound UI widgets.
//!
//! Invariant: applying the stored inverses of all pending operations, in
//! reverse, to the live snapshot reproduces the last server-acknowledged
//! snapshot exactly. Local edits are optimistic; the server never is.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use smol_str::SmolStr;
use tokio::sync::{mpsc, watch};

use scribe_common::path::FIELDS_SEGMENT;
use scribe_common::transport::{RejectReason, TransportEvent};
use scribe_common::{CollabUser, ContentType, Entity, HasId, Operation, Path, value};

use crate::call_buffer::{BufferState, CallBuffer};
use crate::error::SessionError;
use crate::status::{DocStatus, StatusEvent};

/// A locally applied operation awaiting server acknowledgment.
struct PendingOp {
    op: Operation,
    inverse: Operation,
}

struct SessionState {
    sys: scribe_common::Sys,
    /// Entity document root; field data lives under `fields`.
    snapshot: Value,
    /// Unacknowledged local operations, in submit order.
    pending: VecDeque<PendingOp>,
    /// Whether the front of `pending` is currently on the wire.
    in_flight: bool,
    destroyed: bool,
}

struct ListenerEntry {
    id: u64,
    path: Path,
    callback: Box<dyn Fn(Option<&Value>)>,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    entries: Vec<Rc<ListenerEntry>>,
}

struct SessionInner {
    id: SmolStr,
    content_type: ContentType,
    user: CollabUser,
    state: RefCell<SessionState>,
    /// Guards local edits until the transport is ready; replaced with a
    /// fresh buffer on every disconnect.
    buffer: RefCell<CallBuffer>,
    listeners: RefCell<ListenerRegistry>,
    status_tx: watch::Sender<DocStatus>,
    nudge_tx: mpsc::UnboundedSender<()>,
    nudge_rx: RefCell<Option<mpsc::UnboundedReceiver<()>>>,
}

/// A shared OT session for one entity.
///
/// Cloning is cheap and shares the same underlying session; use
/// [`DocumentSession::ptr_eq`] for identity. Sessions are handed out and
/// reference-counted by [`crate::DocPool`].
#[derive(Clone)]
pub struct DocumentSession {
    inner: Rc<SessionInner>,
}

impl DocumentSession {
    /// Create a session in `Connecting` state from a server copy of the
    /// entity.
    pub fn new(entity: Entity, content_type: ContentType, user: CollabUser) -> Self {
        let (status_tx, _) = watch::channel(DocStatus::Connecting);
        let (nudge_tx, nudge_rx) = mpsc::unbounded_channel();

        let mut root = Map::new();
        root.insert(FIELDS_SEGMENT.into(), entity.fields);

        Self {
            inner: Rc::new(SessionInner {
                id: entity.sys.id.clone(),
                content_type,
                user,
                state: RefCell::new(SessionState {
                    sys: entity.sys,
                    snapshot: Value::Object(root),
                    pending: VecDeque::new(),
                    in_flight: false,
                    destroyed: false,
                }),
                buffer: RefCell::new(CallBuffer::new()),
                listeners: RefCell::new(ListenerRegistry::default()),
                status_tx,
                nudge_tx,
                nudge_rx: RefCell::new(Some(nudge_rx)),
            }),
        }
    }

    pub fn id(&self) -> &SmolStr {
        &self.inner.id
    }

    pub fn user(&self) -> &CollabUser {
        &self.inner.user
    }

    pub fn content_type(&self) -> &ContentType {
        &self.inner.content_type
    }

    /// Last server-acknowledged version.
    pub fn version(&self) -> u64 {
        self.inner.state.borrow().sys.version
    }

    /// Subscribe to status changes.
    pub fn status(&self) -> watch::Receiver<DocStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn current_status(&self) -> DocStatus {
        *self.inner.status_tx.borrow()
    }

    /// Whether two handles share one session.
    pub fn ptr_eq(&self, other: &DocumentSession) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }

    /// Read the current value at a path.
    pub fn get_value(&self, path: &Path) -> Option<Value> {
        let st = self.inner.state.borrow();
        value::get_at(&st.snapshot, path).cloned()
    }

    /// Submit a new value for a field path.
    ///
    /// Applied optimistically and broadcast immediately while the
    /// transport is live; buffered while connecting or disconnected.
    pub fn set_value(&self, path: Path, new_value: Value) -> Result<(), SessionError> {
        self.validate_path(&path)?;
        self.submit_local(Operation::Set {
            path,
            value: new_value,
        })
    }

    /// Remove the value at a field path.
    pub fn remove_value(&self, path: Path) -> Result<(), SessionError> {
        self.validate_path(&path)?;
        self.submit_local(Operation::Remove { path })
    }

    /// Register a change listener for one exact path.
    ///
    /// The callback receives the new value at the path (`None` once
    /// removed). Dropping the returned [`Subscription`] unregisters it;
    /// holding it past the widget's lifetime is the classic
    /// duplicate-listener leak.
    pub fn on_value_changed(
        &self,
        path: Path,
        callback: impl Fn(Option<&Value>) + 'static,
    ) -> Result<Subscription, SessionError> {
        if self.is_destroyed() {
            return Err(SessionError::Destroyed);
        }
        let mut registry = self.inner.listeners.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Rc::new(ListenerEntry {
            id,
            path,
            callback: Box::new(callback),
        }));
        Ok(Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        })
    }

    /// Reset local state from a freshly fetched server copy.
    ///
    /// This is the designated conflict recovery: pending local edits are
    /// discarded, the snapshot and version are replaced, and all
    /// registered paths are re-broadcast.
    pub fn resync(&self, entity: Entity) -> Result<(), SessionError> {
        if self.is_destroyed() {
            return Err(SessionError::Destroyed);
        }
        if entity.sys.id != self.inner.id {
            return Err(SessionError::EntityMismatch {
                want: self.inner.id.clone(),
                got: entity.sys.id,
            });
        }
        tracing::info!(
            id = %self.inner.id,
            version = entity.sys.version,
            "resetting local state from server copy"
        );
        {
            let mut st = self.inner.state.borrow_mut();
            st.sys = entity.sys;
            let mut root = Map::new();
            root.insert(FIELDS_SEGMENT.into(), entity.fields);
            st.snapshot = Value::Object(root);
            st.pending.clear();
            st.in_flight = false;
        }
        self.inner.transition(StatusEvent::Resynced);

        let paths: Vec<Path> = {
            let registry = self.inner.listeners.borrow();
            let mut paths = Vec::new();
            for entry in &registry.entries {
                if !paths.contains(&entry.path) {
                    paths.push(entry.path.clone());
                }
            }
            paths
        };
        for path in &paths {
            self.inner.notify_path(path);
        }
        let _ = self.inner.nudge_tx.send(());
        Ok(())
    }

    /// Tear the session down. Idempotent.
    ///
    /// Afterwards edits and subscriptions fail with
    /// [`SessionError::Destroyed`] rather than vanishing silently.
    pub fn destroy(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.destroyed {
                return;
            }
            st.destroyed = true;
            st.pending.clear();
            st.in_flight = false;
        }
        self.inner.buffer.borrow_mut().disable();
        self.inner.listeners.borrow_mut().entries.clear();
        self.inner.transition(StatusEvent::Dropped);
        let _ = self.inner.nudge_tx.send(());
        tracing::debug!(id = %self.inner.id, "document session destroyed");
    }

    /// Feed one transport event into the session.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Remote { op, version } => self.inner.apply_remote(op, version),
            TransportEvent::Connecting => self.inner.transition(StatusEvent::Reconnecting),
            TransportEvent::Connected { version } => self.inner.connected(version),
            TransportEvent::Disconnected => self.inner.disconnected(),
        }
    }

    /// Claim the next operation to put on the wire, if the session is
    /// live and nothing else is in flight.
    pub(crate) fn next_submit(&self) -> Option<(Operation, u64)> {
        if !self.current_status().is_live() {
            return None;
        }
        let mut st = self.inner.state.borrow_mut();
        if st.destroyed || st.in_flight {
            return None;
        }
        let front = st.pending.front()?;
        let op = front.op.clone();
        let version = st.sys.version;
        st.in_flight = true;
        Some((op, version))
    }

    pub(crate) fn handle_ack(&self, version: u64) {
        let mut st = self.inner.state.borrow_mut();
        // A resync while a submit was on the wire clears the in-flight
        // flag; the late ack no longer matches anything pending.
        if !st.in_flight {
            tracing::debug!(id = %self.inner.id, version, "ignoring ack with nothing in flight");
            return;
        }
        st.in_flight = false;
        st.pending.pop_front();
        if version > st.sys.version {
            st.sys.version = version;
        }
        tracing::debug!(id = %self.inner.id, version, "submission acknowledged");
    }

    pub(crate) fn handle_reject(&self, reason: &RejectReason) {
        self.inner.rejected(reason);
    }

    pub(crate) fn handle_submit_error(&self) {
        self.inner.state.borrow_mut().in_flight = false;
        self.inner.transition(StatusEvent::Failed);
    }

    /// The driver's wakeup channel; taken once.
    pub(crate) fn take_nudge_rx(&self) -> Option<mpsc::UnboundedReceiver<()>> {
        self.inner.nudge_rx.borrow_mut().take()
    }

    fn validate_path(&self, path: &Path) -> Result<(), SessionError> {
        if self.is_destroyed() {
            return Err(SessionError::Destroyed);
        }
        let segments = path.segments();
        if segments.len() < 2 || segments[0] != FIELDS_SEGMENT {
            return Err(SessionError::InvalidPath { path: path.clone() });
        }
        let field = &segments[1];
        match self.inner.content_type.field(field) {
            None => Err(SessionError::UnknownField {
                field: field.clone(),
            }),
            Some(def) if def.disabled => Err(SessionError::DisabledField {
                field: field.clone(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn submit_local(&self, op: Operation) -> Result<(), SessionError> {
        let buffer_state = self.inner.buffer.borrow().state();
        match buffer_state {
            BufferState::Open => {
                let inner = Rc::clone(&self.inner);
                self.inner.buffer.borrow_mut().call(move || {
                    // Deferred: no caller left to report to.
                    if let Err(err) = inner.apply_local(op) {
                        tracing::warn!(id = %inner.id, %err, "buffered edit failed to apply");
                    }
                });
                Ok(())
            }
            BufferState::Resolved => Ok(self.inner.apply_local(op)?),
            BufferState::Disabled => Err(SessionError::Destroyed),
        }
    }
}

impl HasId for DocumentSession {
    fn id(&self) -> &str {
        &self.inner.id
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("id", &self.inner.id)
            .field("status", &self.current_status())
            .field("version", &self.version())
            .finish()
    }
}

impl SessionInner {
    fn transition(&self, event: StatusEvent) {
        self.status_tx.send_if_modified(|status| {
            let next = status.after(event);
            if next != *status {
                tracing::debug!(
                    id = %self.id,
                    from = ?*status,
                    to = ?next,
                    ?event,
                    "status change"
                );
                *status = next;
                true
            } else {
                false
            }
        });
    }

    /// Apply a local operation optimistically and queue it for submit.
    fn apply_local(self: &Rc<Self>, op: Operation) -> Result<(), scribe_common::OpError> {
        let path = op.path().clone();
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return Ok(());
            }
            let inverse = op.apply(&mut st.snapshot)?;
            st.pending.push_back(PendingOp { op, inverse });
        }
        self.notify_path(&path);
        let _ = self.nudge_tx.send(());
        Ok(())
    }

    /// Apply a server-acknowledged remote operation, in arrival order.
    fn apply_remote(self: &Rc<Self>, op: Operation, version: u64) {
        if (*self.status_tx.borrow()).is_error() {
            tracing::debug!(
                id = %self.id,
                version,
                "dropping remote operation while awaiting resync"
            );
            return;
        }
        let path = op.path().clone();
        let applied = {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            match op.apply(&mut st.snapshot) {
                Ok(_) => {
                    st.sys.version = version;
                    true
                }
                Err(err) => {
                    tracing::warn!(
                        id = %self.id,
                        %path,
                        %err,
                        "remote operation failed to apply; local state diverged"
                    );
                    false
                }
            }
        };
        if applied {
            self.notify_path(&path);
        } else {
            self.transition(StatusEvent::Failed);
        }
    }

    fn connected(self: &Rc<Self>, version: u64) {
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            if version > st.sys.version {
                st.sys.version = version;
            }
        }
        self.transition(StatusEvent::Connected);

        // Flush queued edits outside the RefCell borrow so change
        // callbacks may re-enter the session.
        let mut queued = std::mem::replace(&mut *self.buffer.borrow_mut(), CallBuffer::new());
        self.buffer.borrow_mut().resolve();
        queued.resolve();

        let _ = self.nudge_tx.send(());
    }

    fn disconnected(&self) {
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            // The in-flight operation stays queued: it is resent after
            // reconnection, never dropped.
            st.in_flight = false;
        }
        self.transition(StatusEvent::Dropped);
        {
            // An open buffer still holds edits made while down; those
            // survive until a connect flushes them. Only a resolved
            // buffer gets replaced.
            let mut buffer = self.buffer.borrow_mut();
            if buffer.state() == BufferState::Resolved {
                *buffer = CallBuffer::new();
            }
        }
        tracing::debug!(id = %self.id, "transport dropped; buffering further edits");
    }

    /// Roll back every unacknowledged local edit and surface the conflict.
    fn rejected(self: &Rc<Self>, reason: &RejectReason) {
        tracing::warn!(
            id = %self.id,
            ?reason,
            "submission rejected; rolling back unacknowledged edits"
        );
        let mut paths: Vec<Path> = Vec::new();
        {
            let mut st = self.state.borrow_mut();
            st.in_flight = false;
            while let Some(pending) = st.pending.pop_back() {
                if let Err(err) = pending.inverse.apply(&mut st.snapshot) {
                    tracing::warn!(id = %self.id, %err, "rollback step failed");
                }
                let path = pending.op.path().clone();
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        self.transition(StatusEvent::Rejected);
        for path in &paths {
            self.notify_path(path);
        }
    }

    /// Broadcast the current value at `path` to its exact-path listeners,
    /// synchronously, within the current tick.
    fn notify_path(&self, path: &Path) {
        let current = {
            let st = self.state.borrow();
            value::get_at(&st.snapshot, path).cloned()
        };
        let targets: Vec<Rc<ListenerEntry>> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.path == *path)
            .cloned()
            .collect();
        for entry in targets {
            (entry.callback)(current.as_ref());
        }
    }
}

/// Handle returned by [`DocumentSession::on_value_changed`].
///
/// Dropping it unregisters the listener.
pub struct Subscription {
    inner: Weak<SessionInner>,
    id: u64,
}

impl Subscription {
    /// Explicitly unregister. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .listeners
                .borrow_mut()
                .entries
                .retain(|entry| entry.id != self.id);
        }
    }
}
