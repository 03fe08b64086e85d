/// Error types for BOTA driver operations
///
/// Every failure surfaces as one of four kinds so callers can decide
/// on retry policy themselves; the driver never retries internally.
use std::io;

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, BotaError>;

/// Driver error enumeration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BotaError {
    /// Invalid or missing connection parameters, bad offset length,
    /// non-positive sample count or scale factor
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport open/send/receive failure, or an operation attempted
    /// while disconnected
    #[error("Connection error: {0}")]
    Connection(String),

    /// No complete frame arrived within the receive window
    #[error("Timeout: no response from sensor within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Received frame failed length or format validation
    #[error("Data error: {0}")]
    Data(String),
}

/// Discriminant of [`BotaError`], for matching without destructuring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Timeout,
    Data,
}

impl BotaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Data(_) => ErrorKind::Data,
        }
    }

    pub(crate) fn not_connected() -> Self {
        Self::Connection("sensor is not connected".to_string())
    }
}

/// Blocking socket reads report an elapsed read timeout as either
/// `WouldBlock` (Unix) or `TimedOut` (Windows, serial ports).
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Convert from io::Error to BotaError
///
/// The timeout duration is not known at this level, so callers that can
/// report it should check [`is_timeout`] before falling back to this.
impl From<io::Error> for BotaError {
    fn from(err: io::Error) -> Self {
        if is_timeout(&err) {
            Self::Timeout { timeout_ms: 0 }
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<serialport::Error> for BotaError {
    fn from(err: serialport::Error) -> Self {
        Self::Connection(format!("serial port: {}", err))
    }
}

impl From<toml::de::Error> for BotaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
