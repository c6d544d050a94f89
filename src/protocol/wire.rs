//! Frame codec for the relay socket.
//!
//! A frame is a big-endian `u32` payload length followed by the payload.
//! Requests and responses use the same framing.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolErrorKind, RelayError};

/// Maximum frame size used when no limit is configured.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8_388_608;

const LENGTH_PREFIX: usize = 4;

fn protocol(kind: ProtocolErrorKind) -> RelayError {
    RelayError::Protocol { kind }
}

/// Read one frame and return its payload.
///
/// A peer that hangs up before sending a length prefix yields
/// `ConnectionClosed`. Declared lengths above `max_size` are rejected
/// before any payload is read.
pub async fn read_message<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, RelayError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX];
    if let Err(e) = reader.read_exact(&mut prefix).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => protocol(ProtocolErrorKind::ConnectionClosed),
            _ => RelayError::Io(e),
        });
    }

    let declared = u32::from_be_bytes(prefix) as usize;
    if declared > max_size {
        return Err(protocol(ProtocolErrorKind::MessageTooLarge {
            size: declared,
            max: max_size,
        }));
    }

    let mut payload = vec![0u8; declared];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write one frame carrying `payload`.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<(), RelayError>
where
    W: AsyncWrite + Unpin,
{
    let declared = u32::try_from(payload.len()).map_err(|_| {
        protocol(ProtocolErrorKind::MessageTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        })
    })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    frame.extend_from_slice(&declared.to_be_bytes());
    frame.extend_from_slice(payload);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn with_deadline<T>(
    limit: Duration,
    io: impl Future<Output = Result<T, RelayError>>,
) -> Result<T, RelayError> {
    match tokio::time::timeout(limit, io).await {
        Ok(result) => result,
        Err(_) => Err(protocol(ProtocolErrorKind::ConnectionTimeout)),
    }
}

/// [`read_message`] bounded by `limit`.
pub async fn read_message_with_timeout<R>(
    reader: &mut R,
    max_size: usize,
    limit: Duration,
) -> Result<Vec<u8>, RelayError>
where
    R: AsyncRead + Unpin,
{
    with_deadline(limit, read_message(reader, max_size)).await
}

/// [`write_message`] bounded by `limit`.
pub async fn write_message_with_timeout<W>(
    writer: &mut W,
    payload: &[u8],
    limit: Duration,
) -> Result<(), RelayError>
where
    W: AsyncWrite + Unpin,
{
    with_deadline(limit, write_message(writer, payload)).await
}
