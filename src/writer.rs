//! Serialized outbound frame writer.
//!
//! Every outbound frame (Register, Pong, Progress, Result, Failure) passes
//! through one mutex-guarded write half, so frames never interleave. A send
//! does not return until the bytes are fully handed to the socket and
//! flushed.
//!
//! Request-scoped sends are gated on the request's cancellation token under
//! the same lock: once a terminal frame for a request has gone out, no
//! later Progress or Result frame for it can follow. Terminal sends also
//! retire the token before the bytes become visible, so by the time the
//! supervisor reads a Result or Failure the connection is already Idle and
//! the next Function is dispatchable.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::protocol::{frame_bytes, Action};
use crate::reporter::CancelToken;

/// Cloneable handle to the write half of the supervisor connection.
#[derive(Clone)]
pub struct FrameWriter {
    inner: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl FrameWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write one frame to completion and flush before releasing the lock.
    pub async fn send(&self, action: Action, body: &[u8]) -> Result<()> {
        let bytes = frame_bytes(action, body)?;
        let mut guard = self.inner.lock().await;
        guard.write_all(&bytes).await?;
        guard.flush().await?;
        Ok(())
    }

    /// Write a Progress frame unless the request is over. Returns whether
    /// the frame went out.
    pub async fn send_progress(&self, token: &CancelToken, body: &[u8]) -> Result<bool> {
        let bytes = frame_bytes(Action::Progress, body)?;
        let mut guard = self.inner.lock().await;
        if token.is_cancelled() {
            return Ok(false);
        }
        guard.write_all(&bytes).await?;
        guard.flush().await?;
        Ok(true)
    }

    /// Emit the request's Result frame and retire the request. Returns
    /// false (writing nothing) when the request already failed.
    pub async fn send_result(&self, token: &CancelToken, body: &[u8]) -> Result<bool> {
        self.send_terminal(token, Action::Result, body).await
    }

    /// Emit a Failure frame and retire the request. Returns false (writing
    /// nothing) when a terminal frame already went out.
    pub async fn send_failure(&self, token: &CancelToken, body: &[u8]) -> Result<bool> {
        self.send_terminal(token, Action::Failure, body).await
    }

    async fn send_terminal(
        &self,
        token: &CancelToken,
        action: Action,
        body: &[u8],
    ) -> Result<bool> {
        let bytes = frame_bytes(action, body)?;
        let mut guard = self.inner.lock().await;
        if token.is_cancelled() {
            return Ok(false);
        }
        // Retire first: the request must be Idle by the time the supervisor
        // can react to the terminal frame.
        token.retire();
        guard.write_all(&bytes).await?;
        guard.flush().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HEADER_SIZE;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_send_writes_header_and_body() {
        let (client, mut server) = duplex(4096);
        let writer = FrameWriter::new(client);

        writer.send(Action::Pong, &[0x11; 32]).await.unwrap();

        let mut buf = vec![0u8; HEADER_SIZE + 32];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..HEADER_SIZE], &[1, 0, 6, 0, 0, 0, 0, 32]);
        assert_eq!(&buf[HEADER_SIZE..], &[0x11; 32]);
    }

    #[tokio::test]
    async fn test_progress_suppressed_after_cancel() {
        let (client, mut server) = duplex(4096);
        let writer = FrameWriter::new(client);
        let token = CancelToken::new();

        assert!(writer.send_progress(&token, &[0, 0, 0, 0, 0, 0]).await.unwrap());

        token.cancel();
        assert!(!writer.send_progress(&token, &[0, 0, 0, 0, 0, 0]).await.unwrap());

        // Only the first frame reached the wire.
        let mut buf = vec![0u8; HEADER_SIZE + 6];
        server.read_exact(&mut buf).await.unwrap();
        drop(writer);
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_result_retires_the_request() {
        let (client, _server) = duplex(4096);
        let writer = FrameWriter::new(client);
        let token = CancelToken::new();

        assert!(writer.send_result(&token, &[0x05]).await.unwrap());
        assert!(token.is_cancelled());

        // A completed request emits nothing further.
        assert!(!writer.send_result(&token, &[0x06]).await.unwrap());
        assert!(!writer.send_failure(&token, &[0, 0, 0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_wins_over_later_result() {
        let (client, mut server) = duplex(4096);
        let writer = FrameWriter::new(client);
        let token = CancelToken::new();

        assert!(writer.send_failure(&token, &[0, 0, 0]).await.unwrap());
        assert!(!writer.send_result(&token, &[0x05]).await.unwrap());

        let mut buf = vec![0u8; HEADER_SIZE + 3];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf[2], Action::Failure.as_u8());
        drop(writer);
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
