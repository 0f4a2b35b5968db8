//! Startup configuration from the environment.
//!
//! The supervisor launches providers with the endpoint parameters in three
//! environment variables. All of them are required; a missing or
//! unparseable value is fatal at startup.

use std::env;

use crate::error::{ProviderError, Result};
use crate::protocol::PID_LEN;

/// Supervisor hostname or IP literal.
pub const HOST_VAR: &str = "THINKNODE_HOST";

/// Supervisor TCP port, decimal.
pub const PORT_VAR: &str = "THINKNODE_PORT";

/// 32-byte process-correlation identifier.
pub const PID_VAR: &str = "THINKNODE_PID";

/// Supervisor endpoint parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Sent verbatim in the Register body.
    pub pid: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = require(HOST_VAR)?;
        let port = require(PORT_VAR)?;
        let port: u16 = port
            .parse()
            .map_err(|_| ProviderError::Env(format!("{PORT_VAR} is not a TCP port: {port:?}")))?;
        let pid = require(PID_VAR)?;
        if pid.len() != PID_LEN {
            return Err(ProviderError::Env(format!(
                "{PID_VAR} must be exactly {PID_LEN} bytes, got {}",
                pid.len()
            )));
        }
        Ok(Self { host, port, pid })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| ProviderError::Env(format!("{name} is not set")))
}
