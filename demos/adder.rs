//! Adder worker - a small arithmetic provider.
//!
//! This demo demonstrates:
//! - Registering computations with typed signatures via the builder
//! - Raising a failure from user code
//! - Reporting progress from a longer computation
//!
//! # Running against a supervisor
//!
//! The supervisor passes the endpoint in the environment:
//!
//! ```sh
//! THINKNODE_HOST=127.0.0.1 \
//! THINKNODE_PORT=9072 \
//! THINKNODE_PID=abcdefghijklmnopqrstuvwxyz012345 \
//! cargo run --example adder
//! ```

use thinknode_provider::{CallFailure, Capability, Provider, TypeDesc, Value};

fn build() -> Result<Provider, thinknode_provider::registry::RegistryError> {
    let provider = Provider::builder()
        .register(
            "Add",
            vec![TypeDesc::Integer, TypeDesc::Integer],
            TypeDesc::Integer,
            Capability::None,
            |args, _ctx| async move {
                let (Some(a), Some(b)) = (args[0].as_integer(), args[1].as_integer()) else {
                    return Err(CallFailure::new("BadArgument", "expected two integers"));
                };
                Ok(Value::Integer(a + b))
            },
        )?
        .register(
            "Divide",
            vec![TypeDesc::Float, TypeDesc::Float],
            TypeDesc::Float,
            Capability::Failure,
            |args, ctx| async move {
                let a = args[0].as_float().unwrap_or(f64::NAN);
                let b = args[1].as_float().unwrap_or(f64::NAN);
                if b == 0.0 {
                    if let Some(failure) = ctx.failure() {
                        let _ = failure.report("DivideByZero", "denominator is zero").await;
                    }
                    return Err(CallFailure::new("DivideByZero", "denominator is zero"));
                }
                Ok(Value::Float(a / b))
            },
        )?
        .register(
            "Mean",
            vec![TypeDesc::Array(Box::new(TypeDesc::Float))],
            TypeDesc::Float,
            Capability::Progress,
            |args, ctx| async move {
                let items = args[0].as_array().unwrap_or(&[]).to_vec();
                if items.is_empty() {
                    return Err(CallFailure::new("EmptyInput", "mean of zero samples"));
                }
                let mut sum = 0.0;
                for (i, item) in items.iter().enumerate() {
                    sum += item.as_float().unwrap_or(0.0);
                    if let Some(progress) = ctx.progress() {
                        let fraction = (i + 1) as f32 / items.len() as f32;
                        let _ = progress.report(fraction, "averaging").await;
                    }
                }
                Ok(Value::Float(sum / items.len() as f64))
            },
        )?
        .build();
    Ok(provider)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let provider = match build() {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("registration failed: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = provider.start().await {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
