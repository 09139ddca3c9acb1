//! Framed message transfer over a persistent byte stream.
//!
//! Frame format: `len:u32 | kind:u32 | payload`, big-endian, where the
//! payload is the JSON encoding of one typed message record. A frame may
//! be followed by raw streamed bytes (a PUT request's file body, a GET
//! response's file body) with no further framing; the declared size in the
//! message is the only delimiter.
//!
//! Layering, leaf-first:
//!
//! ```text
//! +---------------+     +---------------+     +---------------+
//! | BoundedBuffer | --> | wire / stream | --> |    Session    |
//! | (byte window) |     | (frame, copy) |     | (per-conn I/O)|
//! +---------------+     +---------------+     +---------------+
//! ```
//!
//! The buffer is the shared staging area: header parsing may over-read
//! into payload or stream bytes, and the streaming engine drains those
//! before reading the connection again.

pub mod buffer;
pub mod error;
pub mod header;
pub mod message;
pub mod session;
pub mod stream;
pub mod wire;

pub use buffer::BoundedBuffer;
pub use error::Error;
pub use header::{Header, HEADER_SIZE};
pub use message::{
    DeleteFileRequest, DeleteFileResponse, GetFileRequest, GetFileResponse, ListFilenamesRequest,
    ListFilenamesResponse, Message, MessageKind, PutFileRequest, PutFileResponse,
};
pub use session::{Session, BUFFER_SIZE};
pub use stream::stream;
pub use wire::{receive_message, send_message};
