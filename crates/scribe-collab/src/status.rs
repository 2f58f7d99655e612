//! Session status state machine.
//!
//! Tracks the lifecycle of a document session from initial connect through
//! live editing, conflict recovery, and disconnection. The UI uses this to
//! show status indicators and to decide when to trigger a resync.

/// Connection/document status of a session.
///
/// `Conflict` and `Error` are sticky until a resync resets the local
/// state; `Disconnected` can re-enter `Connecting` when the transport
/// retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocStatus {
    /// Waiting for the transport to establish the connection.
    #[default]
    Connecting,
    /// Live: edits are submitted, remote operations applied.
    Ok,
    /// A submission was rejected as stale; resync required.
    Conflict,
    /// The transport or a remote operation failed; resync required.
    Error,
    /// Connectivity lost; edits are buffered.
    Disconnected,
}

/// Events that drive status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The transport (re-)established the connection.
    Connected,
    /// A submission was rejected against a superseded version.
    Rejected,
    /// The transport or a remote application failed.
    Failed,
    /// Connectivity was lost.
    Dropped,
    /// The transport started a reconnect attempt.
    Reconnecting,
    /// Local state was reset from a fresh server copy.
    Resynced,
}

impl DocStatus {
    /// Pure transition function: the status after `event`.
    ///
    /// Conflict and error survive reconnects; only a resync clears them.
    pub fn after(self, event: StatusEvent) -> DocStatus {
        use DocStatus::*;
        use StatusEvent::*;

        match (self, event) {
            (Conflict | Error, Connected) => self,
            (_, Connected) => Ok,
            (_, Rejected) => Conflict,
            (_, Failed) => Error,
            (_, Dropped) => Disconnected,
            (Disconnected, Reconnecting) => Connecting,
            (_, Reconnecting) => self,
            (_, Resynced) => Ok,
        }
    }

    /// True while the session can push submissions to the server.
    pub fn is_live(&self) -> bool {
        matches!(self, DocStatus::Ok)
    }

    /// True if the session requires a resync to recover.
    pub fn is_error(&self) -> bool {
        matches!(self, DocStatus::Conflict | DocStatus::Error)
    }
}
