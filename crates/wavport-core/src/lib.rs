//! Crate `wavport_core`: MP3 / Ogg Vorbis → 16-bit PCM WAV conversion.
//!
//! ```no_run
//! use wavport_core::Converter;
//!
//! let converter = Converter::builder().output_dir("/tmp/converted").build()?;
//! let wav = converter.convert_to_wav("res://music/theme.ogg")?;
//! println!("{}", wav.display());
//! converter.cleanup_converted_files();
//! # Ok::<(), wavport_core::ConvertError>(())
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod quantize;
pub mod wav_writer;

pub use crate::config::{ConverterConfig, ConverterConfigBuilder};
pub use converter::{CleanupReport, Converter, ConverterBuilder};
pub use error::{ConvertError, ErrorKind, WavError};
pub use quantize::quantize;
pub use wav_writer::{WavHeader, WavWriter, write_wav};

pub use wavport_decoder::{AudioDecoder, Codec, PcmStream, StreamInfo};
pub use wavport_paths::{PathResolver, SchemeResolver};
