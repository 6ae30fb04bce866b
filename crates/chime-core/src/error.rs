//! Error types for chime.

use thiserror::Error;

/// Result type alias using chime's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chime.
#[derive(Error, Debug)]
pub enum Error {
    // Stream framing errors
    #[error("invalid frame header at offset {offset}: {reason}")]
    Format { offset: u64, reason: &'static str },

    #[error("no confirmable frame sequence within the scan window")]
    SyncLost,

    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },

    // Decoder errors
    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error("decoder initialization failed: {0}")]
    Init(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the run loop recovers from this error by skipping the
    /// current frame and continuing at the next frame boundary.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::Decode(_))
    }

    /// Returns true if this error terminates the current session.
    pub const fn is_terminal(&self) -> bool {
        !self.is_recoverable()
    }
}
