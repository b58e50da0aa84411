mod symphonia_stream;

use std::path::Path;

use crate::{AudioDecoder, Codec, PcmStream, error::Error};

pub use symphonia_stream::SymphoniaStream;

/// Interleaved samples handed out per `next_chunk` call unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

pub struct Mp3Decoder {
    block_size: usize,
}

impl Mp3Decoder {
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl Default for Mp3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder for Mp3Decoder {
    fn open(&self, path: &Path) -> Result<Box<dyn PcmStream + Send>, Error> {
        SymphoniaStream::open(path, Codec::Mp3, self.block_size).map(|s| Box::new(s) as Box<dyn PcmStream + Send>)
    }
}

pub struct VorbisDecoder {
    block_size: usize,
}

impl VorbisDecoder {
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl Default for VorbisDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder for VorbisDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn PcmStream + Send>, Error> {
        SymphoniaStream::open(path, Codec::Vorbis, self.block_size).map(|s| Box::new(s) as Box<dyn PcmStream + Send>)
    }
}

pub fn default_decoder(codec: Codec, block_size: usize) -> Box<dyn AudioDecoder + Send + Sync> {
    match codec {
        Codec::Mp3 => Box::new(Mp3Decoder::with_block_size(block_size)),
        Codec::Vorbis => Box::new(VorbisDecoder::with_block_size(block_size)),
    }
}
