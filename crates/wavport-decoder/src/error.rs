use thiserror::Error;

use crate::extensions::Codec;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    Unsupported(String),

    #[error("not a valid {expected} stream: {reason}")]
    InvalidStream { expected: Codec, reason: String },

    #[error("decoder: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),
}
