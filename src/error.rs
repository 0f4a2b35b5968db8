//! Error types for the provider runtime.

use thiserror::Error;

/// Fatal runtime errors.
///
/// Anything reported to the supervisor as a Failure frame (unknown function
/// names, argument decode errors, user failures) never appears here; these
/// variants all tear the connection down.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// I/O error on the supervisor connection.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame carried a protocol version other than 1.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// Action byte outside the 0..=6 range.
    #[error("unknown action byte 0x{0:02x}")]
    UnknownAction(u8),

    /// Connection ended in the middle of a frame.
    #[error("connection truncated mid-frame")]
    Truncated,

    /// Peer broke the framing contract.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Startup environment missing or unusable.
    #[error("environment: {0}")]
    Env(String),
}

/// Result type alias using ProviderError.
pub type Result<T> = std::result::Result<T, ProviderError>;
