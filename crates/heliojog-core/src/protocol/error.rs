//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the motor controller
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// No complete response line arrived in time
    #[error("No response within {waited_ms}ms")]
    Timeout {
        /// How long the read waited
        waited_ms: u64,
    },

    /// A response line lacked the expected tag or its value was not a number
    #[error("Cannot parse '{body}' as a {tag} reading")]
    ParseError {
        /// Tag the response should have started with
        tag: &'static str,
        /// The offending text, trimmed
        body: String,
    },

    /// Input the protocol has no meaning for, e.g. an overlong line
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Read or write failure on the underlying stream
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for the bounded-wait expiry, which callers may treat as "no data yet"
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Timeout { .. })
    }
}
