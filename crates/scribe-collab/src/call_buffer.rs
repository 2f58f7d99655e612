//! Deferred-call queue guarding access to state that is not ready yet.
//!
//! A buffer starts open and collects calls. Resolving runs everything
//! queued, in order, and makes later calls run immediately; disabling
//! drops the queue and swallows later calls. Neither transition can be
//! undone; a buffer is single-use.

/// The three lifecycle states of a [`CallBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Collecting calls.
    #[default]
    Open,
    /// Calls run immediately.
    Resolved,
    /// Calls are dropped.
    Disabled,
}

/// A tri-state deferred-call queue.
#[derive(Default)]
pub struct CallBuffer {
    state: BufferState,
    queue: Vec<Box<dyn FnOnce()>>,
}

impl CallBuffer {
    /// Create an open buffer with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Queue, run, or drop `f` depending on the buffer state.
    pub fn call(&mut self, f: impl FnOnce() + 'static) {
        match self.state {
            BufferState::Open => self.queue.push(Box::new(f)),
            BufferState::Resolved => f(),
            BufferState::Disabled => {}
        }
    }

    /// Run every queued call in FIFO order and switch to immediate
    /// execution. No effect unless the buffer is open.
    pub fn resolve(&mut self) {
        if self.state != BufferState::Open {
            return;
        }
        self.state = BufferState::Resolved;
        for f in std::mem::take(&mut self.queue) {
            f();
        }
    }

    /// Drop the queue without running anything and swallow all later
    /// calls. Idempotent, allowed from any state.
    pub fn disable(&mut self) {
        self.state = BufferState::Disabled;
        self.queue.clear();
    }
}

impl std::fmt::Debug for CallBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallBuffer")
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .finish()
    }
}
