//! # thinknode-provider
//!
//! Calculation provider runtime for the Thinknode supervisor protocol.
//!
//! A provider is a worker process that connects over TCP to a calculation
//! supervisor, registers itself as a computation endpoint, and services
//! function-invocation requests by dispatching each one to a statically
//! registered computation, streaming progress and final results back over
//! the same connection.
//!
//! ## Architecture
//!
//! - **Framing**: length-prefixed binary frames with an 8-byte header
//!   (version 1 only), one action byte per message kind.
//! - **Payloads**: each argument and result is a single MessagePack value,
//!   decoded against the parameter types declared at registration.
//! - **Concurrency**: the receive loop never blocks on user code; each
//!   function request runs on its own worker task, pings are answered
//!   independently, and all outbound frames pass through one serialized
//!   writer.
//!
//! ## Example
//!
//! ```ignore
//! use thinknode_provider::{Capability, Provider, TypeDesc, Value};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = Provider::builder()
//!         .register(
//!             "Add",
//!             vec![TypeDesc::Integer, TypeDesc::Integer],
//!             TypeDesc::Integer,
//!             Capability::None,
//!             |args, _ctx| async move {
//!                 Ok(Value::Integer(
//!                     args[0].as_integer().unwrap() + args[1].as_integer().unwrap(),
//!                 ))
//!             },
//!         )
//!         .expect("registration")
//!         .build();
//!
//!     // Reads THINKNODE_HOST / THINKNODE_PORT / THINKNODE_PID.
//!     if let Err(err) = provider.start().await {
//!         eprintln!("fatal: {err}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod reporter;
pub mod writer;

mod dispatch;
mod provider;

pub use codec::{TypeDesc, Value};
pub use config::Config;
pub use error::{ProviderError, Result};
pub use provider::{Provider, ProviderBuilder};
pub use registry::{CallFailure, CallRegistry, CallResult, Capability};
pub use reporter::{CallContext, FailureReporter, ProgressReporter};
