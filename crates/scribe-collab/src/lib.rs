//! Collaborative OT session core.
//!
//! This crate provides:
//! - `CallBuffer`: deferred-call queue guarding pre-connection edits
//! - `LiveSet`: keyed reactive collection broadcasting its contents
//! - `DocPool`: reference-counted registry of shared document sessions
//! - `DocumentSession`: per-entity OT session and status state machine
//! - `run_session`: driver loop wiring a session to its transport
//! - `FieldBinding`: per-field adapter consumed by UI widgets
//!
//! Everything here is single-threaded: sessions are shared via `Rc` and
//! mutation is funnelled through the host's event loop.

mod binding;
mod call_buffer;
mod driver;
mod error;
mod live_set;
mod pool;
mod session;
mod status;

pub use binding::FieldBinding;
pub use call_buffer::{BufferState, CallBuffer};
pub use driver::{DriveError, run_session};
pub use error::SessionError;
pub use live_set::LiveSet;
pub use pool::DocPool;
pub use session::{DocumentSession, Subscription};
pub use status::{DocStatus, StatusEvent};
