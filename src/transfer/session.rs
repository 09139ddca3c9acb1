//! Per-connection bundle: one connection, one staging buffer, one header
//! scratch array.
//!
//! The session's buffer is shared between framing and streaming on
//! purpose: a request header often arrives in the same read as the first
//! chunk of a streamed payload, and a subsequent stream call picks those
//! bytes up from the buffer before reading the connection again.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::transfer::buffer::BoundedBuffer;
use crate::transfer::error::Error;
use crate::transfer::header::HEADER_SIZE;
use crate::transfer::message::Message;
use crate::transfer::stream::stream;
use crate::transfer::wire;

/// Staging buffer capacity per session.
pub const BUFFER_SIZE: usize = 4 * 1024;

pub struct Session<S> {
    conn: S,
    buffer: BoundedBuffer,
    header_scratch: [u8; HEADER_SIZE],
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(conn: S) -> Self {
        Self {
            conn,
            buffer: BoundedBuffer::new(BUFFER_SIZE),
            header_scratch: [0u8; HEADER_SIZE],
        }
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), Error> {
        wire::send_message(
            message,
            &mut self.header_scratch,
            &mut self.buffer,
            &mut self.conn,
        )
        .await
    }

    pub async fn receive_message(&mut self) -> Result<Message, Error> {
        wire::receive_message(&mut self.buffer, &mut self.conn).await
    }

    /// Streams exactly `to_transfer` bytes from `source` to the connection.
    pub async fn stream_to_net<R>(
        &mut self,
        cancel: &CancellationToken,
        source: &mut R,
        to_transfer: u64,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
    {
        stream(cancel, source, &mut self.conn, &mut self.buffer, to_transfer).await
    }

    /// Streams exactly `to_transfer` bytes from the connection to `sink`,
    /// starting with any bytes a preceding message parse over-read.
    pub async fn stream_from_net<W>(
        &mut self,
        cancel: &CancellationToken,
        sink: &mut W,
        to_transfer: u64,
    ) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        stream(cancel, &mut self.conn, sink, &mut self.buffer, to_transfer).await
    }
}
