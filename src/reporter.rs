//! Request-scoped reporters for progress and failure emission.
//!
//! Reporters are values bound to one in-flight request: they share that
//! request's cancellation token and the connection's serialized writer.
//! Progress frames go out in call order; a failure report writes the
//! Failure frame and then flips the token, after which both reporters (and
//! the dispatcher's Result emission) become no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{FailureBody, ProgressBody};
use crate::registry::Capability;
use crate::writer::FrameWriter;

/// Cooperative cancellation flag shared by one request's dispatcher and
/// reporters. Setting it never interrupts the worker; it only suppresses
/// further frames for the request.
///
/// A token minted by the connection also carries the connection's Running
/// flag: retiring the token (done by terminal-frame emission) returns the
/// connection to Idle, so a new Function is dispatchable while an already
/// failed worker keeps running.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fresh token to the connection's Running flag.
    pub(crate) fn bound_to(running: Arc<AtomicBool>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            running,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancel and return the request slot to Idle. Called exactly once per
    /// request, by the emission of its terminal frame.
    pub(crate) fn retire(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }
}

/// Emits Progress frames for one request.
#[derive(Clone)]
pub struct ProgressReporter {
    token: CancelToken,
    writer: FrameWriter,
}

impl ProgressReporter {
    /// Report progress. The fraction is transmitted as-is (callers keep it
    /// in 0..=1); the message is truncated to the wire limit. Silently
    /// dropped once the request is cancelled.
    pub async fn report(&self, fraction: f32, message: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Ok(());
        }
        tracing::debug!(fraction, "reporting progress");
        let body = ProgressBody::new(fraction, message).encode();
        self.writer.send_progress(&self.token, &body).await?;
        Ok(())
    }
}

/// Emits a Failure frame and cancels the request.
#[derive(Clone)]
pub struct FailureReporter {
    token: CancelToken,
    writer: FrameWriter,
}

impl FailureReporter {
    /// Report a failure. The code and message are truncated to the wire
    /// limits; writing the frame cancels the request, so everything the
    /// computation tries to emit afterwards is dropped. A no-op when
    /// already cancelled.
    pub async fn report(&self, code: &str, message: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Ok(());
        }
        tracing::debug!(code, "reporting failure");
        let body = FailureBody::new(code, message).encode();
        self.writer.send_failure(&self.token, &body).await?;
        Ok(())
    }
}

/// Handles passed to a computation, populated per its registered
/// capability.
#[derive(Clone)]
pub struct CallContext {
    token: CancelToken,
    progress: Option<ProgressReporter>,
    failure: Option<FailureReporter>,
}

impl CallContext {
    pub(crate) fn new(token: CancelToken, writer: FrameWriter, capability: Capability) -> Self {
        let progress = capability.wants_progress().then(|| ProgressReporter {
            token: token.clone(),
            writer: writer.clone(),
        });
        let failure = capability.wants_failure().then(|| FailureReporter {
            token: token.clone(),
            writer,
        });
        Self {
            token,
            progress,
            failure,
        }
    }

    /// Context with no reporters, for exercising invokers in tests.
    pub fn detached() -> Self {
        Self {
            token: CancelToken::new(),
            progress: None,
            failure: None,
        }
    }

    /// Progress reporter, present when registered with that capability.
    pub fn progress(&self) -> Option<&ProgressReporter> {
        self.progress.as_ref()
    }

    /// Failure reporter, present when registered with that capability.
    pub fn failure(&self) -> Option<&FailureReporter> {
        self.failure.as_ref()
    }

    /// True once this request has failed; long computations should observe
    /// this and return early.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{read_frame, Action};
    use tokio::io::duplex;

    fn context_over(writer: FrameWriter, capability: Capability) -> CallContext {
        CallContext::new(CancelToken::new(), writer, capability)
    }

    #[tokio::test]
    async fn test_capability_gates_reporters() {
        let (client, _server) = duplex(4096);
        let writer = FrameWriter::new(client);

        let none = context_over(writer.clone(), Capability::None);
        assert!(none.progress().is_none());
        assert!(none.failure().is_none());

        let both = context_over(writer, Capability::Both);
        assert!(both.progress().is_some());
        assert!(both.failure().is_some());
    }

    #[tokio::test]
    async fn test_progress_report_writes_frame() {
        let (client, server) = duplex(4096);
        let writer = FrameWriter::new(client);
        let ctx = context_over(writer, Capability::Progress);

        ctx.progress().unwrap().report(0.5, "halfway").await.unwrap();

        let (mut reader, _keep) = tokio::io::split(server);
        let frame = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(frame.action(), Action::Progress);
        let body = ProgressBody::parse(&frame.body).unwrap();
        assert_eq!(body.fraction, 0.5);
        assert_eq!(body.message, "halfway");
    }

    #[tokio::test]
    async fn test_failure_cancels_and_suppresses_later_frames() {
        let (client, server) = duplex(4096);
        let writer = FrameWriter::new(client);
        let ctx = context_over(writer, Capability::Both);

        ctx.failure().unwrap().report("E", "boom").await.unwrap();
        assert!(ctx.is_cancelled());

        // Late progress and a second failure are both dropped.
        ctx.progress().unwrap().report(0.9, "late").await.unwrap();
        ctx.failure().unwrap().report("E2", "again").await.unwrap();
        drop(ctx);

        let (mut reader, _write_half) = tokio::io::split(server);
        let frame = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(frame.action(), Action::Failure);
        let body = FailureBody::parse(&frame.body).unwrap();
        assert_eq!(body.code, "E");
        assert_eq!(body.message, "boom");

        // All writer handles are gone, so the stream ends here.
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_message_truncated_at_wire_limit() {
        let (client, server) = duplex(256 * 1024);
        let writer = FrameWriter::new(client);
        let ctx = context_over(writer, Capability::Failure);

        let long = "x".repeat(70_000);
        ctx.failure().unwrap().report("E", &long).await.unwrap();
        drop(ctx);

        let (mut reader, _write_half) = tokio::io::split(server);
        let frame = read_frame(&mut reader).await.unwrap().unwrap();
        let body = FailureBody::parse(&frame.body).unwrap();
        assert_eq!(body.message.len(), crate::protocol::MAX_MESSAGE_LEN);
    }
}
