//! Wire protocol for OT session messages.
//!
//! The envelope is postcard; operation payloads travel as opaque JSON
//! bytes inside it, so the envelope stays schema-stable while the
//! structured operation format can evolve.

use serde::{Deserialize, Serialize};

use super::{RejectReason, TransportError};
use crate::op::Operation;

/// Messages a client sends to the OT server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Submit one operation against a known version.
    Submit {
        /// JSON-encoded [`Operation`] (see [`encode_op`]).
        op: Vec<u8>,
        /// The version the operation was produced against.
        version: u64,
    },
    /// Ask for the authoritative state (conflict recovery).
    Resync { have_version: u64 },
}

/// Messages the OT server pushes to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The in-flight submission was accepted.
    Ack { version: u64 },
    /// The in-flight submission was refused.
    Reject { reason: RejectReason },
    /// A remote operation, in acknowledged order.
    Remote {
        /// JSON-encoded [`Operation`].
        op: Vec<u8>,
        version: u64,
    },
}

impl ClientMessage {
    /// Serialize to postcard bytes for wire transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_stdvec(self)
    }

    /// Deserialize from postcard bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

impl ServerMessage {
    /// Serialize to postcard bytes for wire transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_stdvec(self)
    }

    /// Deserialize from postcard bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Encode an operation payload for the wire.
pub fn encode_op(op: &Operation) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(op).map_err(TransportError::OpCodec)
}

/// Decode an operation payload from the wire.
pub fn decode_op(bytes: &[u8]) -> Result<Operation, TransportError> {
    serde_json::from_slice(bytes).map_err(TransportError::OpCodec)
}
