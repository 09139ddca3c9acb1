//! Error taxonomy for the framing and streaming layers.
//!
//! Every variant here is connection-fatal: the request loop that observes
//! one of these closes its connection. Application-level misses (unknown
//! file, bad pattern) are carried as status codes inside normal responses
//! and never appear in this enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The peer closed the connection (zero-length read).
    #[error("connection closed by peer")]
    Closed,

    /// Fewer unread bytes are buffered than a single-shot write requires.
    #[error("buffer has not enough buffered data")]
    NotEnoughBuffered,

    /// A declared payload can never fit into the staging buffer.
    #[error("message of {size} bytes exceeds buffer capacity of {capacity}")]
    TooBigMessage { size: usize, capacity: usize },

    /// The caller-supplied header scratch is shorter than the header width.
    #[error("header buffer too small")]
    HeaderScratchTooSmall,

    /// A decoded discriminator maps to no known message variant.
    #[error("unknown message type {0}")]
    UnknownMessageType(u32),

    /// A message arrived in a role it cannot play (e.g. a response where
    /// a request was required).
    #[error("unexpected message for this point in the exchange")]
    UnexpectedMessage,

    #[error("message payload codec failed: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    Deadline,
}
