//! Framed message exchange over a byte stream.
//!
//! A send serializes the payload into the session's staging buffer, writes
//! the fixed header from the caller's scratch array, then flushes the
//! buffered payload. A receive works header-first: ensure the header width
//! is buffered, decode it, ensure the declared payload length is buffered,
//! then decode the payload into the matching variant. Bytes over-read past
//! the payload stay in the buffer for a subsequent stream call.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::transfer::buffer::BoundedBuffer;
use crate::transfer::error::Error;
use crate::transfer::header::{Header, HEADER_SIZE};
use crate::transfer::message::{Message, MessageKind};

pub async fn send_message<W>(
    message: &Message,
    header_scratch: &mut [u8],
    buffer: &mut BoundedBuffer,
    sink: &mut W,
) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let result = send_framed(message, header_scratch, buffer, sink).await;
    buffer.reset();
    result
}

async fn send_framed<W>(
    message: &Message,
    header_scratch: &mut [u8],
    buffer: &mut BoundedBuffer,
    sink: &mut W,
) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    message.encode_payload(&mut *buffer)?;

    let header = Header {
        payload_size: buffer.len() as u32,
        kind: message.kind() as u32,
    };
    header.encode(header_scratch)?;

    sink.write_all(&header_scratch[..HEADER_SIZE]).await?;
    let payload_size = buffer.len();
    let payload = buffer.next(payload_size);
    sink.write_all(payload).await?;
    sink.flush().await?;
    Ok(())
}

pub async fn receive_message<R>(buffer: &mut BoundedBuffer, source: &mut R) -> Result<Message, Error>
where
    R: AsyncRead + Unpin,
{
    buffer.ensure_buffered_at_least(source, HEADER_SIZE).await?;
    let header = Header::decode(buffer);

    let payload_size = header.payload_size as usize;
    buffer.ensure_buffered_at_least(source, payload_size).await?;

    let kind = MessageKind::from_u32(header.kind).ok_or(Error::UnknownMessageType(header.kind))?;
    let payload = buffer.next(payload_size);
    Ok(Message::decode_payload(kind, payload)?)
}
