//! Device-side error taxonomy
//!
//! - timeouts are recoverable: the cycle is skipped and the sweep goes on
//! - initialization and transport failures are fatal and abort startup

use sonoscan_core::ParseError;
use thiserror::Error;

/// Errors from the device session and its transport.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No matching response arrived within the deadline. Recoverable: the
    /// caller logs it and skips the cycle's outputs.
    #[error("no response from sonar within {0} ms")]
    Timeout(u64),

    /// Hardware present but initialization failed and no fallback permitted.
    /// Fatal: raised at construction, aborts startup.
    #[error("cannot initialize sonar: {0}")]
    InitFailed(String),

    /// Transport failure underneath the protocol
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame or payload
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),
}
