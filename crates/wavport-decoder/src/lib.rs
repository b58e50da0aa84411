//! Decoder adapters: compressed audio in, interleaved `f32` blocks out.

pub mod decoder;
pub mod error;
pub mod extensions;

use std::path::Path;

pub use decoder::{DEFAULT_BLOCK_SIZE, Mp3Decoder, VorbisDecoder, default_decoder};
pub use error::Error;
pub use extensions::{Codec, SupportedExtension, extension_of};

pub trait PcmStream {
    /// Sample rate and channel count, known as soon as the stream is open.
    fn info(&self) -> StreamInfo;

    /// Next block of interleaved `f32` samples in [-1, 1].
    ///
    /// Returns `Ok(None)` once the stream is exhausted; callers stop there.
    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>, Error>;

    /// Releases the underlying resource early. Idempotent; dropping the stream does the same.
    fn close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamInfo {
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }
}

pub trait AudioDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn PcmStream + Send>, Error>;
}
