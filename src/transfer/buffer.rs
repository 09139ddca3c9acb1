//! Fixed-capacity staging buffer shared by the framing and streaming layers.
//!
//! One `BoundedBuffer` belongs to exactly one `Session` and is never shared
//! across tasks. The framing layer parses headers and payloads out of it;
//! the streaming layer drains whatever the framing layer over-read before
//! touching the connection again, which is what lets a request header and
//! the first chunk of file bytes arrive in a single read.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::transfer::error::Error;

/// Byte window over a fixed-capacity allocation.
///
/// Invariant: `0 <= read_offset <= write_end <= capacity`. The unread
/// region is `[read_offset, write_end)`.
pub struct BoundedBuffer {
    storage: Box<[u8]>,
    write_end: usize,
    read_offset: usize,
}

impl BoundedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            write_end: 0,
            read_offset: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.write_end - self.read_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn available(&self) -> usize {
        self.capacity() - self.write_end
    }

    pub fn reset(&mut self) {
        self.write_end = 0;
        self.read_offset = 0;
    }

    /// Copies as many bytes as still fit, growing the written region.
    /// Returns the number copied; the rest is silently dropped.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.available());
        self.storage[self.write_end..self.write_end + n].copy_from_slice(&bytes[..n]);
        self.write_end += n;
        n
    }

    /// Returns the next up-to-`n` unread bytes and consumes them.
    pub fn next(&mut self, n: usize) -> &[u8] {
        if self.is_empty() {
            self.reset();
            return &[];
        }
        let n = n.min(self.len());
        let start = self.read_offset;
        self.read_offset += n;
        &self.storage[start..start + n]
    }

    /// Moves the unread region to the front, making all trailing capacity
    /// contiguous.
    pub fn compact(&mut self) {
        let len = self.len();
        self.storage.copy_within(self.read_offset..self.write_end, 0);
        self.read_offset = 0;
        self.write_end = len;
    }

    /// Performs exactly one read call into `[read_offset, capacity)`. On
    /// success the tracked content becomes exactly the bytes just read; the
    /// buffer is logically reset-then-filled. A zero-length read is
    /// end-of-stream and surfaces as [`Error::Closed`].
    pub async fn single_read_from<R>(&mut self, source: &mut R) -> Result<usize, Error>
    where
        R: AsyncRead + Unpin,
    {
        if self.is_empty() {
            self.reset();
        }
        let start = self.read_offset;
        let n = source.read(&mut self.storage[start..]).await?;
        if n == 0 {
            return Err(Error::Closed);
        }
        self.write_end = start + n;
        Ok(n)
    }

    /// Writes exactly `n` unread bytes to `sink` in one write call and
    /// consumes the amount actually written. Fails with
    /// [`Error::NotEnoughBuffered`] if fewer than `n` unread bytes are
    /// present.
    pub async fn single_write_to<W>(&mut self, sink: &mut W, n: usize) -> Result<usize, Error>
    where
        W: AsyncWrite + Unpin,
    {
        if self.len() < n {
            return Err(Error::NotEnoughBuffered);
        }
        let written = sink
            .write(&self.storage[self.read_offset..self.read_offset + n])
            .await?;
        self.read_offset += written;
        Ok(written)
    }

    /// Reads until at least `n` unread bytes are buffered. Fails with
    /// [`Error::TooBigMessage`] when `n` bytes can never fit, compacting
    /// first if the trailing capacity alone is too small.
    pub async fn ensure_buffered_at_least<R>(&mut self, source: &mut R, n: usize) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
    {
        if !self.make_room_for(n) {
            return Err(Error::TooBigMessage {
                size: n,
                capacity: self.capacity(),
            });
        }
        while self.len() < n {
            self.single_read_from(source).await?;
        }
        Ok(())
    }

    fn make_room_for(&mut self, n: usize) -> bool {
        if n > self.capacity() {
            return false;
        }
        if self.available() < n {
            self.compact();
        }
        true
    }
}

/// Lets `serde_json` encode a message payload straight into the staging
/// buffer. A full buffer shows up as a short write at the encoder rather
/// than a panic here.
impl io::Write for BoundedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(BoundedBuffer::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
