//! Error types for configuration and wire parsing

use thiserror::Error;

/// Errors raised when a proposed sonar configuration is rejected.
///
/// Configuration errors are recoverable: the component that rejected the
/// change keeps its previous state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Angular sweep bounds are inconsistent
    #[error(
        "inconsistent angular settings: angular range is [{min} - {max}] while step is {step}"
    )]
    InvalidAngles { min: u16, max: u16, step: u16 },

    /// A parameter is outside its accepted interval
    #[error("{name} = {value} is out of bounds [{min} - {max}]")]
    OutOfBounds {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The image side length must be even so the disc has an integer radius
    #[error("image_size = {0} must be even")]
    OddImageSize(u16),
}

/// Errors that can occur when parsing ping-protocol frames
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Frame is too short to contain required data
    #[error("Frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Frame doesn't start with the 'B' 'R' marker
    #[error("Invalid start bytes: expected [42, 52], got {actual:02X?}")]
    InvalidStart { actual: Vec<u8> },

    /// Checksum field doesn't match the computed sum
    #[error("Checksum mismatch: frame says {expected:#06X}, computed {computed:#06X}")]
    ChecksumMismatch { expected: u16, computed: u16 },

    /// Payload length field doesn't match actual payload length
    #[error("Length mismatch: header says {header_len} bytes, frame has {actual_len}")]
    LengthMismatch { header_len: usize, actual_len: usize },

    /// Message id is not the one the caller asked for
    #[error("Unexpected message id: expected {expected}, got {actual}")]
    UnexpectedMessage { expected: u16, actual: u16 },

    /// Failed to deserialize a payload structure
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

impl From<bincode::Error> for ParseError {
    fn from(e: bincode::Error) -> Self {
        ParseError::DeserializationFailed(e.to_string())
    }
}
