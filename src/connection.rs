//! Connection engine: receive loop, request slot, ping worker.
//!
//! The engine owns the socket halves. The receive loop is the only reader;
//! it never blocks on user code. Function requests are handed to a
//! dispatcher task, pings are answered from their own task, and everything
//! else arriving inbound is a fatal protocol violation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::dispatch;
use crate::error::{ProviderError, Result};
use crate::protocol::{read_frame, register_body, Action, FailureBody, Frame, PID_LEN, PING_TOKEN_LEN};
use crate::registry::CallRegistry;
use crate::reporter::CancelToken;
use crate::writer::FrameWriter;

/// Tracks the at-most-one in-flight function request.
///
/// The Running flag is shared with the request's cancellation token; the
/// terminal-frame emission retires the token and returns the flag to Idle.
#[derive(Debug, Default)]
struct RequestSlot {
    running: Arc<AtomicBool>,
}

impl RequestSlot {
    /// Enter Running and mint the request's cancellation token. `None` when
    /// a request is already in flight.
    fn begin(&self) -> Option<CancelToken> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CancelToken::bound_to(self.running.clone()))
    }
}

/// One established supervisor connection.
///
/// Generic over the transport halves so the engine runs identically over a
/// TCP stream or an in-memory duplex in tests.
pub struct Connection<R> {
    reader: R,
    writer: FrameWriter,
    registry: Arc<CallRegistry>,
    slot: RequestSlot,
}

impl<R> Connection<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new<W>(reader: R, writer: W, registry: CallRegistry) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader,
            writer: FrameWriter::new(writer),
            registry: Arc::new(registry),
            slot: RequestSlot::default(),
        }
    }

    /// Announce this provider to the supervisor.
    pub async fn register(&self, pid: &str) -> Result<()> {
        if pid.len() != PID_LEN {
            return Err(ProviderError::Env(format!(
                "pid must be exactly {PID_LEN} bytes, got {}",
                pid.len()
            )));
        }
        tracing::info!("registering with supervisor");
        self.writer.send(Action::Register, &register_body(pid)).await
    }

    /// Receive loop. Returns `Ok(())` when the supervisor closes the
    /// connection at a frame boundary, `Err` on any fatal error.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let frame = match read_frame(&mut self.reader).await? {
                Some(frame) => frame,
                None => {
                    tracing::info!("supervisor closed the connection");
                    return Ok(());
                }
            };
            self.handle(frame).await?;
        }
    }

    async fn handle(&mut self, frame: Frame) -> Result<()> {
        match frame.action() {
            Action::Function => self.handle_function(frame).await,
            Action::Ping => self.handle_ping(frame),
            other => Err(ProviderError::Protocol(format!(
                "inbound {other} frame"
            ))),
        }
    }

    /// Hand a Function body to a dispatcher task, enforcing the
    /// one-request-at-a-time contract.
    async fn handle_function(&mut self, frame: Frame) -> Result<()> {
        let Some(token) = self.slot.begin() else {
            let body = FailureBody::new(
                "ProtocolViolation",
                "function request received while another is running",
            )
            .encode();
            self.writer.send(Action::Failure, &body).await?;
            return Err(ProviderError::Protocol(
                "overlapping function requests".to_string(),
            ));
        };

        let registry = self.registry.clone();
        let writer = self.writer.clone();
        tokio::spawn(async move {
            if let Err(err) = dispatch::run(frame.body, registry, writer, token).await {
                tracing::error!(error = %err, "request write failed");
            }
        });
        Ok(())
    }

    /// Echo the ping token from a separate task. Pings are serviceable at
    /// any time, including while a function request is in flight.
    fn handle_ping(&self, frame: Frame) -> Result<()> {
        if frame.body.len() != PING_TOKEN_LEN {
            return Err(ProviderError::Protocol(format!(
                "ping body must be {PING_TOKEN_LEN} bytes, got {}",
                frame.body.len()
            )));
        }
        tracing::debug!("received ping");
        let writer = self.writer.clone();
        tokio::spawn(async move {
            if let Err(err) = writer.send(Action::Pong, &frame.body).await {
                tracing::error!(error = %err, "pong write failed");
            }
        });
        Ok(())
    }
}
