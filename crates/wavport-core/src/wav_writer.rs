//! Streaming RIFF/WAVE writer for 16-bit PCM.
//!
//! The header goes out first with zeroed size fields; once the payload is
//! complete we seek back and patch them:
//!
//! ```text
//! offset  size  field
//!      0     4  "RIFF"
//!      4     4  RIFF chunk size = data size + 36   (patched)
//!      8     4  "WAVE"
//!     12     4  "fmt "
//!     16     4  16
//!     20     2  1 (PCM)
//!     22     2  channels
//!     24     4  sample rate
//!     28     4  byte rate   = rate * channels * 2
//!     32     2  block align = channels * 2
//!     34     2  16 (bits per sample)
//!     36     4  "data"
//!     40     4  data size                           (patched)
//!     44     …  samples, interleaved, little-endian
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Seek, SeekFrom, Write},
    path::Path,
};

use tracing::{Level, debug, instrument};
use wavport_decoder::{PcmStream, StreamInfo};

use crate::{error::WavError, quantize::quantize_into};

pub const HEADER_LEN: u64 = 44;
pub const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
const FORMAT_PCM: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;
const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;
/// Bytes between the RIFF size field and the payload.
const RIFF_OVERHEAD: u32 = 36;
const MAX_DATA_LEN: u64 = (u32::MAX - RIFF_OVERHEAD) as u64;

pub struct WavWriter<W: Write + Seek> {
    inner: W,
    data_len: u64,
    scratch: Vec<u8>,
}

impl WavWriter<BufWriter<File>> {
    /// Creates `path` exclusively (it must not exist yet) and writes the header.
    pub fn create(path: &Path, info: StreamInfo) -> Result<Self, WavError> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Self::new(BufWriter::new(file), info)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(mut inner: W, info: StreamInfo) -> Result<Self, WavError> {
        write_header(&mut inner, info)?;
        Ok(Self {
            inner,
            data_len: 0,
            scratch: Vec::new(),
        })
    }

    /// Quantizes and appends interleaved samples.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), WavError> {
        let added = samples.len() as u64 * BYTES_PER_SAMPLE as u64;
        if self.data_len + added > MAX_DATA_LEN {
            return Err(WavError::PayloadTooLarge(self.data_len + added));
        }

        self.scratch.clear();
        quantize_into(samples, &mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        self.data_len += added;
        Ok(())
    }

    /// Payload bytes written so far.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Patches both size fields and hands back the sink, positioned at the end.
    pub fn finalize(mut self) -> Result<(W, u64), WavError> {
        // write_samples keeps data_len <= MAX_DATA_LEN
        let data_len = self.data_len as u32;

        self.inner.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.inner.write_all(&data_len.to_le_bytes())?;
        self.inner.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.inner.write_all(&(data_len + RIFF_OVERHEAD).to_le_bytes())?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;

        Ok((self.inner, self.data_len))
    }
}

fn write_header<W: Write>(w: &mut W, info: StreamInfo) -> Result<(), WavError> {
    if !info.is_valid() {
        return Err(WavError::InvalidFormat(format!(
            "{} Hz, {} channels",
            info.sample_rate, info.channels
        )));
    }

    let block_align = info
        .channels
        .checked_mul(BYTES_PER_SAMPLE)
        .ok_or_else(|| WavError::InvalidFormat(format!("{} channels", info.channels)))?;
    let byte_rate = info
        .sample_rate
        .checked_mul(block_align as u32)
        .ok_or_else(|| WavError::InvalidFormat(format!("{} Hz", info.sample_rate)))?;

    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    header.extend_from_slice(&info.channels.to_le_bytes());
    header.extend_from_slice(&info.sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&0u32.to_le_bytes());
    debug_assert_eq!(header.len() as u64, HEADER_LEN);

    w.write_all(&header)?;
    Ok(())
}

/// Drains `source` into a new WAV file at `path`. Returns the payload size in bytes.
///
/// On error the file is left as-is, possibly truncated.
#[instrument(level = Level::DEBUG, skip(path, source), fields(path = %path.display()), err)]
pub fn write_wav(path: &Path, info: StreamInfo, source: &mut dyn PcmStream) -> Result<u64, WavError> {
    let mut writer = WavWriter::create(path, info)?;

    while let Some(block) = source.next_chunk()? {
        writer.write_samples(&block)?;
    }

    let (sink, data_len) = writer.finalize()?;
    sink.into_inner().map_err(|e| e.into_error())?;

    debug!(data_len, "wav payload written");
    Ok(data_len)
}

/// Header fields as read back from a finished file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parses the canonical 44-byte header this module writes.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..HEADER_LEN as usize)?;
        if &b[0..4] != b"RIFF" || &b[8..12] != b"WAVE" || &b[12..16] != b"fmt " || &b[36..40] != b"data" {
            return None;
        }
        let u16_at = |o: usize| u16::from_le_bytes([b[o], b[o + 1]]);
        let u32_at = |o: usize| u32::from_le_bytes([b[o], b[o + 1], b[o + 2], b[o + 3]]);
        if u32_at(16) != FMT_CHUNK_LEN || u16_at(20) != FORMAT_PCM {
            return None;
        }
        Some(Self {
            riff_size: u32_at(4),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_size: u32_at(40),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wavport_decoder::Error as DecoderError;

    const STEREO_44K: StreamInfo = StreamInfo {
        sample_rate: 44_100,
        channels: 2,
    };

    /// Hands out pre-built blocks, then optionally fails.
    struct Blocks {
        blocks: Vec<Vec<f32>>,
        fail_after: bool,
    }

    impl PcmStream for Blocks {
        fn info(&self) -> StreamInfo {
            STEREO_44K
        }

        fn next_chunk(&mut self) -> Result<Option<Vec<f32>>, DecoderError> {
            if self.blocks.is_empty() {
                if self.fail_after {
                    return Err(DecoderError::Unsupported("broken frame".into()));
                }
                return Ok(None);
            }
            Ok(Some(self.blocks.remove(0)))
        }
    }

    #[test]
    fn header_sizes_match_payload() {
        let mut w = WavWriter::new(Cursor::new(Vec::new()), STEREO_44K).unwrap();
        let n = 1234;
        w.write_samples(&vec![0.25; n]).unwrap();
        let (cursor, data_len) = w.finalize().unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(data_len, (n * 2) as u64);
        assert_eq!(bytes.len() as u64, HEADER_LEN + data_len);

        let h = WavHeader::parse(&bytes).unwrap();
        assert_eq!(h.data_size, (n * 2) as u32);
        assert_eq!(h.riff_size, (n * 2 + 36) as u32);
        assert_eq!(h.channels, 2);
        assert_eq!(h.sample_rate, 44_100);
        assert_eq!(h.byte_rate, 44_100 * 2 * 2);
        assert_eq!(h.block_align, 4);
        assert_eq!(h.bits_per_sample, 16);
    }

    #[test]
    fn empty_payload_is_still_valid() {
        let w = WavWriter::new(Cursor::new(Vec::new()), STEREO_44K).unwrap();
        let (cursor, data_len) = w.finalize().unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(data_len, 0);
        assert_eq!(bytes.len(), 44);
        let h = WavHeader::parse(&bytes).unwrap();
        assert_eq!(h.data_size, 0);
        assert_eq!(h.riff_size, 36);
    }

    #[test]
    fn samples_are_quantized_little_endian() {
        let mut w = WavWriter::new(Cursor::new(Vec::new()), STEREO_44K).unwrap();
        w.write_samples(&[1.0, -1.0, 3.0, f32::NAN]).unwrap();
        let (cursor, _) = w.finalize().unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&bytes[44..], &[0xFF, 0x7F, 0x01, 0x80, 0xFF, 0x7F, 0x00, 0x00]);
    }

    #[test]
    fn rejects_degenerate_format() {
        let zero_channels = StreamInfo {
            sample_rate: 44_100,
            channels: 0,
        };
        assert!(matches!(
            WavWriter::new(Cursor::new(Vec::new()), zero_channels),
            Err(WavError::InvalidFormat(_))
        ));
    }

    #[test]
    fn write_wav_streams_until_exhausted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.wav");
        let mut source = Blocks {
            blocks: vec![vec![0.5; 1000], vec![-0.5; 800], vec![0.0; 200]],
            fail_after: false,
        };

        let data_len = write_wav(&path, STEREO_44K, &mut source).unwrap();
        assert_eq!(data_len, 4000);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples.len(), 2000);
        assert_eq!(samples[0], 16384);
        assert_eq!(samples[1000], -16384);
        assert_eq!(samples[1999], 0);
    }

    #[test]
    fn write_wav_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("taken.wav");
        std::fs::write(&path, b"existing").unwrap();
        let mut source = Blocks {
            blocks: vec![],
            fail_after: false,
        };
        let err = write_wav(&path, STEREO_44K, &mut source).unwrap_err();
        assert!(matches!(err, WavError::Io(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"existing");
    }

    #[test]
    fn source_failure_is_reported_as_source() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("partial.wav");
        let mut source = Blocks {
            blocks: vec![vec![0.1; 64]],
            fail_after: true,
        };
        let err = write_wav(&path, STEREO_44K, &mut source).unwrap_err();
        assert!(matches!(err, WavError::Source(_)));
        // the truncated file stays behind for the caller to deal with
        assert!(path.exists());
    }
}
