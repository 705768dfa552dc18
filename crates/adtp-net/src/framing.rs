//! Length-prefixed framing: length (4 bytes BE) || data.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum envelope frame size (64 KiB). Registrations are small; anything
/// larger is a protocol violation.
pub const MAX_ENVELOPE_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("frame too large: {0} bytes (max {1})")]
    TooLarge(usize, usize),
    #[error("truncated frame")]
    Truncated,
    #[error("malformed envelope frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Write one frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), FramingError> {
    if data.len() > MAX_ENVELOPE_FRAME_SIZE {
        return Err(FramingError::TooLarge(data.len(), MAX_ENVELOPE_FRAME_SIZE));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. Returns `Ok(None)` on clean EOF at a frame boundary;
/// EOF inside a frame is `Truncated`.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, FramingError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_ENVELOPE_FRAME_SIZE {
        return Err(FramingError::TooLarge(len, MAX_ENVELOPE_FRAME_SIZE));
    }

    let mut frame = vec![0u8; len];
    match reader.read_exact(&mut frame).await {
        Ok(_) => Ok(Some(frame)),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::Truncated),
        Err(err) => Err(err.into()),
    }
}
