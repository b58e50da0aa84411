use std::{ffi::OsStr, fmt, path::Path, str::FromStr};

use symphonia::core::codecs::{CODEC_TYPE_MP3, CODEC_TYPE_VORBIS, CodecType};

/// Input extensions the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedExtension {
    Mp3,
    Ogg,
    Wav,
}

impl SupportedExtension {
    pub const ALL: &'static [SupportedExtension] =
        &[SupportedExtension::Mp3, SupportedExtension::Ogg, SupportedExtension::Wav];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedExtension::Mp3 => "mp3",
            SupportedExtension::Ogg => "ogg",
            SupportedExtension::Wav => "wav",
        }
    }

    /// Codec that must be decoded for this extension; `None` means passthrough.
    pub fn codec(&self) -> Option<Codec> {
        match self {
            SupportedExtension::Mp3 => Some(Codec::Mp3),
            SupportedExtension::Ogg => Some(Codec::Vorbis),
            SupportedExtension::Wav => None,
        }
    }
}

impl FromStr for SupportedExtension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim_start_matches('.').to_ascii_lowercase();
        SupportedExtension::ALL
            .iter()
            .find(|ext| ext.as_str() == lower)
            .cloned()
            .ok_or_else(|| format!("Extension not supported: {}", s))
    }
}

impl fmt::Display for SupportedExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lower-cased extension of `path`, empty if it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Compressed codecs with a decoder adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Mp3,
    Vorbis,
}

impl Codec {
    pub const ALL: &'static [Codec] = &[Codec::Mp3, Codec::Vorbis];

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Mp3 => "MP3",
            Codec::Vorbis => "Vorbis",
        }
    }

    pub(crate) fn codec_type(&self) -> CodecType {
        match self {
            Codec::Mp3 => CODEC_TYPE_MP3,
            Codec::Vorbis => CODEC_TYPE_VORBIS,
        }
    }

    /// Extension handed to symphonia as a format hint.
    pub(crate) fn hint(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            Codec::Vorbis => "ogg",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
