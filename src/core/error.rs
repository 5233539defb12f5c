/*!
Error handling for the QKD link simulation.

The protocol engine only fails on malformed input, and the session controller
ignores requests its guard refuses. What remains are argument and
configuration errors, round steps driven out of order, and failures of the
narrative service, which are resolved to fallback text before they reach the
session.
*/

use std::fmt;
use thiserror::Error;

/// Result type for the QKD link simulation
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the QKD link simulation
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input to an engine or controller call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Call made out of order for the round it targets
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// State the call requires
        expected: String,
        /// State actually found
        actual: String,
    },

    /// Narrative service failure
    #[error("Narrative service failed")]
    Narrative(#[source] NarrativeError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the narrative analysis service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrativeError {
    /// No API key available
    #[error("API key not configured")]
    MissingCredential,

    /// Request could not be delivered
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// Service answered without any text
    #[error("Response contained no text")]
    EmptyResponse,

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<NarrativeError> for Error {
    fn from(err: NarrativeError) -> Self {
        Error::Narrative(err)
    }
}

/// Which kind of value an argument check rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// Photon count
    PhotonCount,
    /// Duration
    Duration,
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentKind::PhotonCount => write!(f, "photon count"),
            ArgumentKind::Duration => write!(f, "duration"),
        }
    }
}

/// Create an invalid argument error
#[macro_export]
macro_rules! invalid_argument_err {
    ($msg:expr) => {
        Err($crate::error::Error::InvalidArgument($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::error::Error::InvalidArgument(format!($fmt, $($arg)*)))
    };
}

/// Create an invalid state error
#[macro_export]
macro_rules! invalid_state_err {
    ($expected:expr, $actual:expr) => {
        Err($crate::error::Error::InvalidState {
            expected: $expected.to_string(),
            actual: $actual.to_string(),
        })
    };
}

/// Create an invalid configuration error
#[macro_export]
macro_rules! config_err {
    ($msg:expr) => {
        Err($crate::error::Error::InvalidConfig($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::error::Error::InvalidConfig(format!($fmt, $($arg)*)))
    };
}
