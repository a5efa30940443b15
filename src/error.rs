//! Error types for the intonation crate.

use thiserror::Error;

/// Errors that can occur while loading, analysing, editing, or rendering a track.
#[derive(Debug, Error)]
pub enum IntonationError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// WAV decoding or encoding failure.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    /// Only mono input is supported.
    #[error("unsupported channel count: {0} (expected mono)")]
    UnsupportedChannels(u16),
    /// Sample rate must be positive.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    /// The waveform contains no samples.
    #[error("waveform is empty")]
    EmptyWaveform,
    /// Malformed persisted data or unsupported sample format.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// Analysis parameters are out of range.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// An edit would violate a chunk or contour invariant.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),
    /// A long-running operation was cancelled by its progress monitor.
    #[error("operation cancelled")]
    Cancelled,
    /// The playback command queue has no free slot.
    #[error("playback queue full")]
    QueueFull,
}

impl From<serde_json::Error> for IntonationError {
    fn from(err: serde_json::Error) -> Self {
        IntonationError::InvalidFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IntonationError::UnsupportedChannels(2);
        assert!(err.to_string().contains('2'));

        let err = IntonationError::InvalidSampleRate(0);
        assert!(err.to_string().contains("sample rate"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wav");
        let err: IntonationError = io.into();
        assert!(matches!(err, IntonationError::Io(_)));
        assert!(err.to_string().contains("missing.wav"));
    }
}
