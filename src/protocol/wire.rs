//! Wire header encoding and decoding.
//!
//! Implements the 8-byte header format:
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬───────────┐
//! │ Version  │ Reserved │ Action   │ Reserved │ Length    │
//! │ 1 byte=1 │ 1 byte=0 │ 1 byte   │ 1 byte=0 │ 4 bytes   │
//! │          │          │          │          │ uint32 BE │
//! └──────────┴──────────┴──────────┴──────────┴───────────┘
//! ```
//!
//! Reserved bytes are don't-care on input and written as 0 on output.

use crate::error::{ProviderError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// The only protocol version this runtime speaks.
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest body a peer may declare (1 GiB).
pub const MAX_BODY_LEN: u32 = 1_073_741_824;

/// Ping and pong bodies are fixed-size opaque tokens.
pub const PING_TOKEN_LEN: usize = 32;

/// Byte length of the process-correlation identifier.
pub const PID_LEN: usize = 32;

/// Register body: 2-byte protocol sub-identifier plus the pid.
pub const REGISTER_BODY_LEN: usize = 2 + PID_LEN;

/// Logical message kind carried in byte 2 of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    Register = 0,
    Function = 1,
    Progress = 2,
    Result = 3,
    Failure = 4,
    Ping = 5,
    Pong = 6,
}

impl Action {
    /// Decode an action byte. Total for 0..=6, error for everything else.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Action::Register),
            1 => Ok(Action::Function),
            2 => Ok(Action::Progress),
            3 => Ok(Action::Result),
            4 => Ok(Action::Failure),
            5 => Ok(Action::Ping),
            6 => Ok(Action::Pong),
            other => Err(ProviderError::UnknownAction(other)),
        }
    }

    /// The wire byte for this action.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Action::Register => "Register",
            Action::Function => "Function",
            Action::Progress => "Progress",
            Action::Result => "Result",
            Action::Failure => "Failure",
            Action::Ping => "Ping",
            Action::Pong => "Pong",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version (always 1 on anything this runtime emits).
    pub version: u8,
    /// Message kind.
    pub action: Action,
    /// Body length in bytes.
    pub length: u32,
}

impl Header {
    /// Create a version-1 header.
    pub fn new(action: Action, length: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            action,
            length,
        }
    }

    /// Encode the header to bytes (Big Endian).
    ///
    /// Fails with `UnsupportedVersion` when the version is not 1.
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        if self.version != PROTOCOL_VERSION {
            return Err(ProviderError::UnsupportedVersion(self.version));
        }
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.version;
        buf[2] = self.action.as_u8();
        buf[4..8].copy_from_slice(&self.length.to_be_bytes());
        Ok(buf)
    }

    /// Decode a header from bytes (Big Endian).
    ///
    /// Fails with `UnsupportedVersion` or `UnknownAction`; the reserved
    /// bytes at [1] and [3] are not inspected.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        if buf[0] != PROTOCOL_VERSION {
            return Err(ProviderError::UnsupportedVersion(buf[0]));
        }
        let action = Action::from_u8(buf[2])?;
        let length = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        Ok(Self {
            version: buf[0],
            action,
            length,
        })
    }

    /// Reject headers declaring bodies past the ceiling.
    pub fn validate_length(&self) -> Result<()> {
        if self.length > MAX_BODY_LEN {
            return Err(ProviderError::Protocol(format!(
                "body length {} exceeds maximum {}",
                self.length, MAX_BODY_LEN
            )));
        }
        Ok(())
    }
}
