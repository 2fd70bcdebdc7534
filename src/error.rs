//! Error types for fragwire.

use thiserror::Error;

/// Which endpoint created the receive machinery.
///
/// The size-cap errors carry this so the surfaced message names the side
/// whose limit was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The connection initiator.
    Client,
    /// The connection acceptor.
    Server,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Client => f.write_str("client"),
            Origin::Server => f.write_str("server"),
        }
    }
}

/// Main error type for all fragwire operations.
///
/// Every framing violation resets the affected reassembly state before the
/// error surfaces; there is no automatic retry or resynchronization. The
/// transport is expected to terminate the channel on any of these.
#[derive(Debug, Error)]
pub enum FragwireError {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fragment header carried an object id that is zero or negative as a
    /// signed 64-bit quantity.
    #[error("fragment header carries an invalid object id")]
    InvalidObjectId,

    /// Header plus blob length exceeds the signed 32-bit fragment budget.
    #[error("fragment of {length} bytes exceeds the protocol limit")]
    FragmentTooLarge { length: u64 },

    /// A mid-object fragment named a different object than the one being
    /// reassembled.
    #[error("fragment for object {actual} arrived while object {expected} was being reassembled")]
    ObjectIdMismatch { expected: u64, actual: u64 },

    /// A mid-object fragment arrived out of sequence.
    #[error("fragment {actual} of object {object_id} arrived while fragment {expected} was expected")]
    FragmentOutOfSequence {
        object_id: u64,
        expected: u64,
        actual: u64,
    },

    /// Cumulative reassembled size of one object exceeded the configured cap.
    #[error("{origin} received an object exceeding the maximum allowed size of {limit} bytes")]
    ObjectTooLarge { origin: Origin, limit: u64 },

    /// Aggregate inbound raw data exceeded the session-wide cap.
    #[error("{origin} received more raw data than the maximum allowed {limit} bytes")]
    TotalDataTooLarge { origin: Origin, limit: u64 },

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Transport-level framing violation (bad chunk header, unknown
    /// priority tag, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Connection closed while data was still expected.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using FragwireError.
pub type Result<T> = std::result::Result<T, FragwireError>;
