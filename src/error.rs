//! # Error Types
//!
//! Custom error types for Lightbar Bridge using `thiserror`.
//!
//! "Nothing heard" during a scan and "no channel reported sent" during a
//! transmit are normal outcomes carried in the returned reports, not errors.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Lightbar Bridge
#[derive(Debug, Error)]
pub enum LightbarError {
    /// SPI / GPIO transaction failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The radio session lock could not be acquired in time
    #[error("Timed out after {0:?} waiting for the radio lock")]
    LockTimeout(Duration),

    /// Argument rejected before any hardware access
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connectivity probe failed its write/read-back check
    #[error("Connection check failed: {0}")]
    ConnectionCheck(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LightbarError {
    /// True for failures of the bus itself (as opposed to caller mistakes
    /// or lock contention).
    pub fn is_transport(&self) -> bool {
        matches!(self, LightbarError::Transport(_) | LightbarError::Io(_))
    }
}

/// Result type alias for Lightbar Bridge
pub type Result<T> = std::result::Result<T, LightbarError>;
