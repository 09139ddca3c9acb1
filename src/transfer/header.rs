//! Fixed-width frame header: payload length plus message-type discriminator.
//!
//! Wire format, big-endian: `len:u32 | kind:u32`. The header is written
//! into a caller-supplied scratch array so sending a message never
//! allocates.

use bytes::{Buf, BufMut};

use crate::transfer::buffer::BoundedBuffer;
use crate::transfer::error::Error;

/// Header width on the wire.
pub const HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub payload_size: u32,
    pub kind: u32,
}

impl Header {
    /// Encodes into `scratch`, which must be at least [`HEADER_SIZE`] bytes.
    pub fn encode(&self, scratch: &mut [u8]) -> Result<(), Error> {
        if scratch.len() < HEADER_SIZE {
            return Err(Error::HeaderScratchTooSmall);
        }
        let mut cursor = &mut scratch[..HEADER_SIZE];
        cursor.put_u32(self.payload_size);
        cursor.put_u32(self.kind);
        Ok(())
    }

    /// Consumes [`HEADER_SIZE`] unread bytes from the buffer. The caller
    /// must have ensured they are buffered.
    pub fn decode(buffer: &mut BoundedBuffer) -> Header {
        let mut bytes = buffer.next(HEADER_SIZE);
        Header {
            payload_size: bytes.get_u32(),
            kind: bytes.get_u32(),
        }
    }
}
