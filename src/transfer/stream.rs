//! Bounded-buffer streaming between a byte source and a byte sink.
//!
//! Moves exactly `to_transfer` bytes end to end, draining bytes the framing
//! layer already staged before touching the source again. Cancellation is
//! checked without blocking at the top of every iteration.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::transfer::buffer::BoundedBuffer;
use crate::transfer::error::Error;

/// Transfers exactly `to_transfer` bytes from `source` to `sink` through
/// `buffer`. Unread bytes already staged in `buffer` are written first.
/// `to_transfer == 0` is a no-op. Any single read or write failure aborts
/// the transfer; partial transfers are not resumed.
pub async fn stream<R, W>(
    cancel: &CancellationToken,
    source: &mut R,
    sink: &mut W,
    buffer: &mut BoundedBuffer,
    to_transfer: u64,
) -> Result<(), Error>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if to_transfer == 0 {
        return Ok(());
    }

    let mut written: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let buffered = buffer.len() as u64;
        if buffered > 0 {
            let limit = buffered.min(to_transfer - written) as usize;
            let n = buffer.single_write_to(sink, limit).await?;
            written += n as u64;
            if written == to_transfer {
                break;
            }
        }
        buffer.reset();

        buffer.single_read_from(source).await?;
    }
    Ok(())
}
