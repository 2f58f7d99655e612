//! Transport boundary consumed by document sessions.
//!
//! The transport owns the wire: it delivers remote operations already
//! transformed into acknowledged order, accepts local submissions, and
//! reports connectivity. Stall detection and reconnection live here too;
//! the session only reacts to the events this module defines.

mod messages;
mod presence;

use futures_util::stream::LocalBoxStream;
use miette::Diagnostic;
use smol_str::SmolStr;

use crate::op::Operation;

pub use messages::{ClientMessage, ServerMessage, decode_op, encode_op};
pub use presence::{COLLABORATOR_COLORS, Collaborator, color_for};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[diagnostic(code(scribe::transport))]
pub enum TransportError {
    #[error("failed to connect")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to submit operation")]
    Submit(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to decode message")]
    Decode(#[source] postcard::Error),

    #[error("failed to encode operation payload")]
    OpCodec(#[source] serde_json::Error),

    #[error("transport closed")]
    Closed,
}

/// Result of a successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectInfo {
    /// Server-side entity version at connect time.
    pub version: u64,
}

/// Why the server refused a submission.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RejectReason {
    /// The submission was made against a superseded version.
    VersionMismatch { server_version: u64 },
    /// The operation itself was refused.
    Invalid { message: SmolStr },
}

/// Server response to a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; the entity now has this version.
    Acked { version: u64 },
    /// Refused; nothing was applied server-side.
    Rejected { reason: RejectReason },
}

/// Events pushed from the transport to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A remote operation in acknowledged order, with the version it
    /// produced.
    Remote { op: Operation, version: u64 },
    /// A reconnect attempt started.
    Connecting,
    /// The connection (re-)established; the server is at this version.
    Connected { version: u64 },
    /// Connectivity lost.
    Disconnected,
}

/// The connection a document session drives its edits through.
///
/// Futures returned here are polled on a single thread; they need not be
/// `Send`.
#[allow(async_fn_in_trait)]
pub trait OtTransport {
    /// Establish the connection. Resolves once the server accepted us.
    async fn connect(&mut self) -> Result<ConnectInfo, TransportError>;

    /// Submit one operation against a version; resolves with the server's
    /// verdict. At most one submission is in flight per session.
    async fn submit(
        &mut self,
        op: &Operation,
        version: u64,
    ) -> Result<SubmitOutcome, TransportError>;

    /// The inbound event stream. Taken once, after `connect`.
    fn events(&mut self) -> LocalBoxStream<'static, TransportEvent>;
}
