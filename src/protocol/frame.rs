//! Frame-level I/O: exact-length reads, contiguous frame assembly.
//!
//! The receive side reads exactly 8 header bytes and then exactly `length`
//! body bytes, looping over short reads. End-of-stream in the middle of a
//! frame is a fatal [`ProviderError::Truncated`]; end-of-stream on a frame
//! boundary is a clean close.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::wire::{Action, Header, HEADER_SIZE};
use crate::error::{ProviderError, Result};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a frame from an action and body; the header length is derived.
    pub fn new(action: Action, body: Bytes) -> Self {
        Self {
            header: Header::new(action, body.len() as u32),
            body,
        }
    }

    #[inline]
    pub fn action(&self) -> Action {
        self.header.action
    }
}

/// Assemble a complete frame as a single byte vector.
pub fn frame_bytes(action: Action, body: &[u8]) -> Result<Vec<u8>> {
    let header = Header::new(action, body.len() as u32);
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.encode()?);
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Read one frame from the supervisor connection.
///
/// Returns `Ok(None)` when the peer closes the connection before the first
/// header byte.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = reader.read(&mut head[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProviderError::Truncated);
        }
        filled += n;
    }

    let header = Header::decode(&head)?;
    header.validate_length()?;

    let mut body = vec![0u8; header.length as usize];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ProviderError::Truncated,
            _ => ProviderError::Io(e),
        })?;

    Ok(Some(Frame {
        header,
        body: Bytes::from(body),
    }))
}
