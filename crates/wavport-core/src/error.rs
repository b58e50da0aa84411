use std::{fmt, io, path::PathBuf};

use thiserror::Error;

pub use wavport_decoder::Error as DecoderError;
pub use wavport_paths::Error as PathsError;

/// Coarse classification of a failed request, stable across error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedFormat,
    DecoderOpen,
    Decode,
    OutputWrite,
    Cleanup,
    Config,
    Aborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::DecoderOpen => "DecoderOpenError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::OutputWrite => "OutputWriteError",
            ErrorKind::Cleanup => "CleanupError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the WAV container writer.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("I/O: {0}")]
    Io(#[from] io::Error),

    #[error("invalid PCM format: {0}")]
    InvalidFormat(String),

    #[error("payload of {0} bytes does not fit a RIFF container")]
    PayloadTooLarge(u64),

    /// The sample source failed mid-stream.
    #[error("sample source: {0}")]
    Source(#[from] DecoderError),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input path is null or empty")]
    InvalidInput,

    #[error("unsupported format: .{0}")]
    UnsupportedFormat(String),

    #[error("failed to open {}: {source}", .path.display())]
    DecoderOpen { path: PathBuf, source: DecoderError },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode { path: PathBuf, source: DecoderError },

    #[error("failed to write {}: {source}", .path.display())]
    OutputWrite { path: PathBuf, source: WavError },

    #[error("output directory {} is unusable: {source}", .path.display())]
    OutputDir { path: PathBuf, source: PathsError },

    #[error(transparent)]
    Cleanup(PathsError),

    #[error("configuration: {0}")]
    Config(String),

    #[error("configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("conversion task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InvalidInput => ErrorKind::InvalidInput,
            ConvertError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ConvertError::DecoderOpen { .. } => ErrorKind::DecoderOpen,
            ConvertError::Decode { .. } => ErrorKind::Decode,
            ConvertError::OutputWrite { .. } | ConvertError::OutputDir { .. } => ErrorKind::OutputWrite,
            ConvertError::Cleanup(_) => ErrorKind::Cleanup,
            ConvertError::Config(_) | ConvertError::ConfigLoad(_) => ErrorKind::Config,
            ConvertError::Aborted(_) => ErrorKind::Aborted,
        }
    }
}
