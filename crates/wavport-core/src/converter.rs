use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, error, info, info_span, warn};
use wavport_decoder::{
    AudioDecoder, Codec, Error as DecoderError, SupportedExtension, default_decoder, extension_of,
};
use wavport_paths::{OutputDirectory, PathResolver, SchemeResolver, default_user_root};

use crate::{
    config::ConverterConfig,
    error::{ConvertError, WavError},
    wav_writer,
};

type DynResolver = Box<dyn PathResolver + Send + Sync>;
type DynDecoder = Box<dyn AudioDecoder + Send + Sync>;

#[derive(Default)]
pub struct ConverterBuilder {
    cfg: ConverterConfig,
    resolver: Option<DynResolver>,
    decoders: HashMap<Codec, DynDecoder>,
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, cfg: ConverterConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.output_dir = Some(dir.into());
        self
    }

    pub fn with_resolver<R: PathResolver + Send + Sync + 'static>(mut self, r: R) -> Self {
        self.resolver = Some(Box::new(r));
        self
    }

    /// Replaces the decoder used for `codec`.
    pub fn with_decoder<D: AudioDecoder + Send + Sync + 'static>(mut self, codec: Codec, d: D) -> Self {
        self.decoders.insert(codec, Box::new(d));
        self
    }

    /// Resolves defaults and makes sure the output directory exists.
    pub fn build(self) -> Result<Converter, ConvertError> {
        let cfg = self.cfg;
        cfg.validate()?;

        let user_root = match &cfg.user_root {
            Some(root) => root.clone(),
            None => default_user_root().map_err(|e| ConvertError::Config(e.to_string()))?,
        };
        let output = match &cfg.output_dir {
            Some(dir) => OutputDirectory::new(dir),
            None => OutputDirectory::under(&user_root),
        };

        let resolver = match self.resolver {
            Some(r) => r,
            None => {
                let resource_root = match &cfg.resource_root {
                    Some(root) => root.clone(),
                    None => std::env::current_dir().map_err(|e| ConvertError::Config(e.to_string()))?,
                };
                Box::new(SchemeResolver::new(resource_root, &user_root))
            }
        };

        let mut decoders = self.decoders;
        for &codec in Codec::ALL {
            decoders
                .entry(codec)
                .or_insert_with(|| default_decoder(codec, cfg.block_size));
        }

        output.ensure().map_err(|source| ConvertError::OutputDir {
            path: output.path().to_path_buf(),
            source,
        })?;
        debug!(output_dir = %output.path().display(), "converter ready");

        Ok(Converter {
            cfg,
            output,
            resolver,
            decoders,
        })
    }
}

/// Outcome of [`Converter::cleanup_converted_files`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<ConvertError>,
}

/// Turns MP3/Ogg Vorbis inputs into 16-bit PCM WAV files inside a managed
/// output directory. WAV inputs pass through untouched.
pub struct Converter {
    cfg: ConverterConfig,
    output: OutputDirectory,
    resolver: DynResolver,
    decoders: HashMap<Codec, DynDecoder>,
}

impl Converter {
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.cfg
    }

    pub fn output_dir(&self) -> &Path {
        self.output.path()
    }

    /// Converts `input` (`res://`, `user://` or a filesystem path) to WAV and
    /// returns the absolute path of the result.
    ///
    /// Blocking. Every failure is logged and returned, never raised.
    pub fn convert_to_wav(&self, input: &str) -> Result<PathBuf, ConvertError> {
        let span = info_span!("convert_to_wav", input);
        let _guard = span.enter();

        let result = self.convert(input);
        if let Err(e) = &result {
            error!(kind = %e.kind(), "ConvertToWav failed: {e}");
        }
        result
    }

    /// Runs [`Converter::convert_to_wav`] on tokio's blocking pool.
    pub async fn convert_to_wav_async(self: Arc<Self>, input: String) -> Result<PathBuf, ConvertError> {
        tokio::task::spawn_blocking(move || self.convert_to_wav(&input)).await?
    }

    fn convert(&self, input: &str) -> Result<PathBuf, ConvertError> {
        if input.trim().is_empty() {
            return Err(ConvertError::InvalidInput);
        }

        let absolute = self.resolver.resolve(input);
        let ext = extension_of(&absolute);
        debug!(path = %absolute.display(), ext, "resolved");

        let kind: SupportedExtension = ext
            .parse()
            .map_err(|_| ConvertError::UnsupportedFormat(ext.clone()))?;
        let Some(codec) = kind.codec() else {
            debug!("already WAV, passing through");
            return Ok(absolute);
        };
        let decoder = self
            .decoders
            .get(&codec)
            .ok_or_else(|| ConvertError::UnsupportedFormat(ext.clone()))?;

        // the directory may have been removed since start-up
        self.output.ensure().map_err(|source| ConvertError::OutputDir {
            path: self.output.path().to_path_buf(),
            source,
        })?;
        let stem = absolute
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = self.output.unique_wav_path(&stem);

        let mut stream = decoder
            .open(&absolute)
            .map_err(|source| ConvertError::DecoderOpen {
                path: absolute.clone(),
                source,
            })?;
        let stream_info = stream.info();
        if !stream_info.is_valid() {
            return Err(ConvertError::DecoderOpen {
                path: absolute,
                source: DecoderError::InvalidStream {
                    expected: codec,
                    reason: format!(
                        "invalid stream layout ({} Hz, {} channels)",
                        stream_info.sample_rate, stream_info.channels
                    ),
                },
            });
        }
        debug!(
            %codec,
            sample_rate = stream_info.sample_rate,
            channels = stream_info.channels,
            "converting"
        );

        let written = wav_writer::write_wav(&output, stream_info, stream.as_mut());
        stream.close();

        match written {
            Ok(data_len) => {
                info!(output = %output.display(), data_len, "converted");
                Ok(output)
            }
            Err(e) => {
                if self.cfg.remove_partial_on_failure {
                    self.discard_partial(&output);
                }
                Err(match e {
                    WavError::Source(source) => ConvertError::Decode { path: absolute, source },
                    other => ConvertError::OutputWrite {
                        path: output,
                        source: other,
                    },
                })
            }
        }
    }

    fn discard_partial(&self, output: &Path) {
        match fs::remove_file(output) {
            Ok(()) => debug!(path = %output.display(), "removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %output.display(), error = %e, "could not remove partial output"),
        }
    }

    /// Deletes every WAV in the output directory. Per-file failures are
    /// collected, they do not stop the purge.
    pub fn cleanup_converted_files(&self) -> CleanupReport {
        let report = self.output.purge_wavs();
        if !report.is_clean() {
            warn!(failed = report.failures.len(), "some converted files could not be deleted");
        }
        CleanupReport {
            removed: report.removed,
            failures: report.failures.into_iter().map(ConvertError::Cleanup).collect(),
        }
    }
}
