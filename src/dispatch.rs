//! Per-request dispatch: decode, invoke, emit exactly one terminal frame.
//!
//! Runs off the receive loop, one task per Function request. Whatever
//! happens inside, the request resolves to exactly one of Result or
//! Failure on the wire, and every Failure path flips the request's
//! cancellation token.

use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{decode_value, encode_value};
use crate::error::Result;
use crate::protocol::{FailureBody, FunctionBody};
use crate::registry::CallRegistry;
use crate::reporter::{CallContext, CancelToken};
use crate::writer::FrameWriter;

pub(crate) async fn run(
    body: Bytes,
    registry: Arc<CallRegistry>,
    writer: FrameWriter,
    token: CancelToken,
) -> Result<()> {
    let call = match FunctionBody::parse(&body) {
        Ok(call) => call,
        Err(err) => return fail(&writer, &token, "Malformed", &err.to_string()).await,
    };
    tracing::info!(name = %call.name, args = call.args.len(), "received function message");

    let descriptor = match registry.lookup(&call.name, call.args.len()) {
        Ok(descriptor) => descriptor,
        Err(err) => return fail(&writer, &token, err.code(), &err.to_string()).await,
    };

    let mut args = Vec::with_capacity(call.args.len());
    for (payload, ty) in call.args.iter().zip(&descriptor.params) {
        match decode_value(payload, ty) {
            Ok(value) => args.push(value),
            Err(err) => return fail(&writer, &token, err.kind_name(), &err.to_string()).await,
        }
    }

    let ctx = CallContext::new(token.clone(), writer.clone(), descriptor.capability);
    let worker = tokio::spawn(descriptor.invoker().invoke(args, ctx));

    match worker.await {
        Ok(Ok(value)) => match encode_value(&value, &descriptor.returns) {
            Ok(payload) => {
                let written = writer.send_result(&token, &payload).await?;
                if written {
                    tracing::info!(name = %call.name, "completed function");
                } else {
                    tracing::debug!(name = %call.name, "result dropped, request already failed");
                }
                Ok(())
            }
            Err(err) => fail(&writer, &token, "Encode", &err.to_string()).await,
        },
        Ok(Err(failure)) => fail(&writer, &token, &failure.code, &failure.message).await,
        Err(join) => {
            let message = panic_message(join);
            fail(&writer, &token, "Panic", &message).await
        }
    }
}

/// Write a Failure frame, cancelling and retiring the request. A no-op
/// when a terminal frame already went out.
async fn fail(writer: &FrameWriter, token: &CancelToken, code: &str, message: &str) -> Result<()> {
    tracing::info!(code, message, "reporting failure");
    let body = FailureBody::new(code, message).encode();
    writer.send_failure(token, &body).await?;
    Ok(())
}

/// Unwrap a worker join error to the innermost panic payload.
fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "computation panicked".to_string()
        }
    } else {
        "computation was aborted".to_string()
    }
}
