use std::{fs::File, io, path::Path};

use symphonia::core::{
    audio::{SampleBuffer, SignalSpec},
    codecs::{Decoder, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use crate::{Codec, PcmStream, StreamInfo, error::Error};

struct Session {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_buf: Option<SampleBuffer<f32>>,
}

/// Pull-based PCM stream over a symphonia format reader + decoder pair.
///
/// Blocks always hold whole frames; only the last one may be shorter than
/// the configured block size.
pub struct SymphoniaStream {
    session: Option<Session>,
    info: StreamInfo,
    block_size: usize,
    pending: Vec<f32>,
    finished: bool,
}

fn is_eof(err: &SymphoniaError) -> bool {
    matches!(err, SymphoniaError::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

impl SymphoniaStream {
    pub fn open(path: &Path, codec: Codec, block_size: usize) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidStream { expected: codec, reason };

        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(codec.hint());

        let detected = get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| invalid(e.to_string()))?;
        let format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec == codec.codec_type())
            .ok_or_else(|| invalid(format!("no {codec} track found")))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| invalid(e.to_string()))?;

        let mut stream = SymphoniaStream {
            session: Some(Session {
                format,
                decoder,
                track_id,
                sample_buf: None,
            }),
            info: StreamInfo {
                sample_rate: params.sample_rate.unwrap_or(0),
                channels: params.channels.map(|c| c.count() as u16).unwrap_or(0),
            },
            block_size,
            pending: Vec::new(),
            finished: false,
        };

        if !stream.info.is_valid() {
            stream.recover_layout().map_err(|e| invalid(e.to_string()))?;
        }
        if !stream.info.is_valid() {
            return Err(invalid(format!(
                "invalid stream layout ({} Hz, {} channels)",
                stream.info.sample_rate, stream.info.channels
            )));
        }

        let channels = stream.info.channels as usize;
        stream.block_size = (block_size / channels).max(1) * channels;

        debug!(
            path = %path.display(),
            %codec,
            sample_rate = stream.info.sample_rate,
            channels = stream.info.channels,
            "decoder opened"
        );
        Ok(stream)
    }

    /// Some containers only reveal the layout once a packet is decoded. Fills
    /// the missing fields from the first packet, which stays queued in `pending`.
    fn recover_layout(&mut self) -> Result<(), Error> {
        match self.decode_packet()? {
            Some(spec) => {
                if self.info.sample_rate == 0 {
                    self.info.sample_rate = spec.rate;
                }
                if self.info.channels == 0 {
                    self.info.channels = spec.channels.count() as u16;
                }
            }
            None => self.finished = true,
        }
        Ok(())
    }

    /// Decodes the next packet of our track into `pending`.
    /// Returns `None` at end of stream.
    fn decode_packet(&mut self) -> Result<Option<SignalSpec>, Error> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        loop {
            let packet = match session.format.next_packet() {
                Ok(packet) => packet,
                Err(e) if is_eof(&e) => return Ok(None),
                // A new logical stream starts (chained ogg); we only convert the first.
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != session.track_id {
                continue;
            }

            match session.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let frames = decoded.capacity();
                    let needed = frames * spec.channels.count();
                    if session.sample_buf.as_ref().is_none_or(|b| b.capacity() < needed) {
                        session.sample_buf = Some(SampleBuffer::new(frames as u64, spec));
                    }
                    if let Some(buf) = session.sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        self.pending.extend_from_slice(buf.samples());
                    }
                    return Ok(Some(spec));
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!("skipping corrupt frame: {msg}");
                    continue;
                }
                Err(e) if is_eof(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl PcmStream for SymphoniaStream {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>, Error> {
        while !self.finished && self.pending.len() < self.block_size {
            if self.decode_packet()?.is_none() {
                self.finished = true;
            }
        }

        if self.pending.is_empty() {
            self.close();
            return Ok(None);
        }

        let take = self.pending.len().min(self.block_size);
        Ok(Some(self.pending.drain(..take).collect()))
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("decoder closed");
        }
        self.pending.clear();
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioDecoder, Mp3Decoder, VorbisDecoder};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, mono, no CRC: 417 bytes per frame.
    /// Zeroed side info and main data decode to digital silence.
    fn silent_mp3(frames: usize) -> Vec<u8> {
        const FRAME_LEN: usize = 417;
        let mut out = Vec::with_capacity(frames * FRAME_LEN);
        for _ in 0..frames {
            let mut frame = vec![0u8; FRAME_LEN];
            frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
            out.extend_from_slice(&frame);
        }
        out
    }

    fn temp_file(suffix: &str, bytes: &[u8]) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    /// Flips `big_values` in the first granule past its 288 limit, which the
    /// MP3 decoder reports as a recoverable decode error.
    fn corrupt_mp3_frame(bytes: &mut [u8], index: usize) {
        let side_info = index * 417 + 4;
        bytes[side_info + 3] |= 0x03;
        bytes[side_info + 4] |= 0xFE;
    }

    fn drain(stream: &mut dyn PcmStream) -> Vec<f32> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next_chunk().unwrap() {
            out.extend(chunk);
        }
        out
    }

    /// Vorbis header fields are packed least significant bit first.
    #[derive(Default)]
    struct BitWriter {
        bytes: Vec<u8>,
        bits: usize,
    }

    impl BitWriter {
        fn put(&mut self, value: u32, width: u32) -> &mut Self {
            for i in 0..width {
                if self.bits % 8 == 0 {
                    self.bytes.push(0);
                }
                if (value >> i) & 1 == 1 {
                    let last = self.bytes.len() - 1;
                    self.bytes[last] |= 1 << (self.bits % 8);
                }
                self.bits += 1;
            }
            self
        }
    }

    /// Ogg page checksum: CRC-32, polynomial 0x04c11db7, no reflection, zero init.
    fn ogg_crc(data: &[u8]) -> u32 {
        data.iter().fold(0u32, |crc, &byte| {
            let mut crc = crc ^ (u32::from(byte) << 24);
            for _ in 0..8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ 0x04c1_1db7
                } else {
                    crc << 1
                };
            }
            crc
        })
    }

    fn ogg_page(out: &mut Vec<u8>, flags: u8, granule: u64, sequence: u32, packets: &[Vec<u8>]) {
        let start = out.len();
        out.extend_from_slice(b"OggS");
        out.push(0);
        out.push(flags);
        out.extend_from_slice(&granule.to_le_bytes());
        out.extend_from_slice(&0x5741_5650u32.to_le_bytes());
        out.extend_from_slice(&sequence.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.push(packets.len() as u8);
        for packet in packets {
            assert!(packet.len() < 255);
            out.push(packet.len() as u8);
        }
        for packet in packets {
            out.extend_from_slice(packet);
        }
        let crc = ogg_crc(&out[start..]);
        out[start + 22..start + 26].copy_from_slice(&crc.to_le_bytes());
    }

    /// Frames produced by each audio packet after the first: both block sizes are 256.
    const VORBIS_HOP: usize = 128;

    /// Smallest well-formed Ogg Vorbis stream: one 2-entry codebook, a floor 1
    /// without partitions, an empty residue and a single short-block mode.
    /// Every audio packet marks all floors unused, so the output is silence.
    fn silent_vorbis(channels: u8, sample_rate: u32, packets: usize) -> Vec<u8> {
        let mut ident = vec![1];
        ident.extend_from_slice(b"vorbis");
        ident.extend_from_slice(&0u32.to_le_bytes());
        ident.push(channels);
        ident.extend_from_slice(&sample_rate.to_le_bytes());
        ident.extend_from_slice(&[0; 12]);
        ident.push(0x88);
        ident.push(1);

        let vendor = b"wavport";
        let mut comment = vec![3];
        comment.extend_from_slice(b"vorbis");
        comment.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        comment.extend_from_slice(vendor);
        comment.extend_from_slice(&0u32.to_le_bytes());
        comment.push(1);

        let mut bits = BitWriter::default();
        // codebooks: one, 1 dimension, 2 entries of length 1, no lookup table
        bits.put(0, 8).put(0x56_4342, 24).put(1, 16).put(2, 24);
        bits.put(0, 1).put(0, 1).put(0, 5).put(0, 5).put(0, 4);
        // time domain placeholders
        bits.put(0, 6).put(0, 16);
        // floors: one type 1, no partitions, multiplier 1, 8 range bits
        bits.put(0, 6).put(1, 16).put(0, 5).put(0, 2).put(8, 4);
        // residues: one type 1 covering nothing, one classification, no books
        bits.put(0, 6).put(1, 16).put(0, 24).put(0, 24).put(0, 24);
        bits.put(0, 6).put(0, 8).put(0, 3).put(0, 1);
        // mappings: one type 0, single submap, no coupling
        bits.put(0, 6).put(0, 16).put(0, 1).put(0, 1).put(0, 2);
        bits.put(0, 8).put(0, 8).put(0, 8);
        // modes: one short block
        bits.put(0, 6).put(0, 1).put(0, 16).put(0, 16).put(0, 8);
        // framing
        bits.put(1, 1);
        let mut setup = vec![5];
        setup.extend_from_slice(b"vorbis");
        setup.extend_from_slice(&bits.bytes);

        let audio = vec![vec![0u8]; packets];
        let granule = (packets.saturating_sub(1) * VORBIS_HOP) as u64;

        let mut out = Vec::new();
        ogg_page(&mut out, 0x02, 0, 0, &[ident]);
        ogg_page(&mut out, 0x00, 0, 1, &[comment, setup]);
        ogg_page(&mut out, 0x04, granule, 2, &audio);
        out
    }

    #[test]
    fn missing_file_fails_to_open() {
        let err = Mp3Decoder::new()
            .open(Path::new("/definitely/not/here.mp3"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn garbage_is_not_a_stream() {
        let f = temp_file(".ogg", &[0x13u8; 2048]);
        let err = VorbisDecoder::new().open(f.path()).err().unwrap();
        assert!(matches!(err, Error::InvalidStream { expected: Codec::Vorbis, .. }));
    }

    #[test]
    fn vorbis_decoder_rejects_mp3_bitstream() {
        let f = temp_file(".ogg", &silent_mp3(8));
        assert!(VorbisDecoder::new().open(f.path()).is_err());
    }

    #[test]
    fn silent_mp3_decodes_to_zeroes() {
        let f = temp_file(".mp3", &silent_mp3(10));
        let mut stream = Mp3Decoder::with_block_size(1000).open(f.path()).unwrap();

        assert_eq!(
            stream.info(),
            StreamInfo {
                sample_rate: 44_100,
                channels: 1
            }
        );

        let mut total = 0;
        while let Some(chunk) = stream.next_chunk().unwrap() {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= 1000);
            assert!(chunk.iter().all(|s| *s == 0.0));
            total += chunk.len();
        }
        assert!(total > 0);
        assert!(total <= 10 * 1152);

        // exhausted streams stay exhausted, close is idempotent
        assert!(stream.next_chunk().unwrap().is_none());
        stream.close();
        stream.close();
    }

    #[test]
    fn corrupt_mp3_frame_is_skipped() {
        let clean = temp_file(".mp3", &silent_mp3(9));
        let expected = drain(&mut *Mp3Decoder::new().open(clean.path()).unwrap());

        let mut bytes = silent_mp3(10);
        corrupt_mp3_frame(&mut bytes, 4);
        let damaged = temp_file(".mp3", &bytes);
        let samples = drain(&mut *Mp3Decoder::new().open(damaged.path()).unwrap());

        assert!(!samples.is_empty());
        assert_eq!(samples.len(), expected.len());
        assert!(samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn missing_layout_is_recovered_from_first_packet() {
        let f = temp_file(".mp3", &silent_mp3(4));
        let expected = drain(&mut SymphoniaStream::open(f.path(), Codec::Mp3, 4096).unwrap());

        let mut stream = SymphoniaStream::open(f.path(), Codec::Mp3, 4096).unwrap();
        let declared = stream.info();
        assert!(stream.pending.is_empty());

        stream.info = StreamInfo {
            sample_rate: 0,
            channels: 0,
        };
        stream.recover_layout().unwrap();

        assert_eq!(stream.info(), declared);
        // the packet decoded for the layout is still delivered
        assert!(!stream.pending.is_empty());
        assert_eq!(drain(&mut stream).len(), expected.len());

        // nothing left to decode: the layout stays unknown
        stream.info = StreamInfo {
            sample_rate: 0,
            channels: 0,
        };
        stream.recover_layout().unwrap();
        assert!(!stream.info().is_valid());
        assert!(stream.finished);
    }

    #[test]
    fn silent_vorbis_decodes_to_zeroes() {
        let f = temp_file(".ogg", &silent_vorbis(2, 22_050, 9));
        let mut stream = VorbisDecoder::with_block_size(500).open(f.path()).unwrap();

        assert_eq!(
            stream.info(),
            StreamInfo {
                sample_rate: 22_050,
                channels: 2
            }
        );

        let mut total = 0;
        while let Some(chunk) = stream.next_chunk().unwrap() {
            assert!(chunk.len() <= 500);
            assert_eq!(chunk.len() % 2, 0);
            assert!(chunk.iter().all(|s| *s == 0.0));
            total += chunk.len();
        }
        // the first packet only primes the overlap window
        assert_eq!(total, 8 * VORBIS_HOP * 2);
        assert!(stream.next_chunk().unwrap().is_none());
    }

    #[test]
    fn mp3_decoder_rejects_vorbis_bitstream() {
        let f = temp_file(".mp3", &silent_vorbis(1, 8_000, 4));
        let err = Mp3Decoder::new().open(f.path()).err().unwrap();
        assert!(matches!(err, Error::InvalidStream { expected: Codec::Mp3, .. }));
    }
}
