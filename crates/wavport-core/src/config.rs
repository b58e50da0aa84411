use config::{Config, Environment, File, FileFormat};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wavport_decoder::DEFAULT_BLOCK_SIZE;

use crate::error::ConvertError;

/// Prefix of environment overrides, e.g. `WAVPORT_BLOCK_SIZE=8192`.
pub const ENV_PREFIX: &str = "WAVPORT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
#[serde(default)]
pub struct ConverterConfig {
    /// Where converted files go. Defaults to `<user_root>/converted`.
    pub output_dir: Option<PathBuf>,
    /// What `res://` maps onto. Defaults to the current directory.
    pub resource_root: Option<PathBuf>,
    /// What `user://` maps onto. Defaults to the platform data directory.
    pub user_root: Option<PathBuf>,
    /// Max interleaved samples pulled from a decoder per step.
    pub block_size: usize,
    /// Delete the truncated output when a conversion fails after writing began.
    pub remove_partial_on_failure: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            output_dir: None,
            resource_root: None,
            user_root: None,
            block_size: DEFAULT_BLOCK_SIZE,
            remove_partial_on_failure: false,
        }
    }
}

impl ConverterConfig {
    /// Loads a TOML file, then applies `WAVPORT_*` environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let cfg: ConverterConfig = cfg.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults plus `WAVPORT_*` environment overrides.
    pub fn from_env() -> Result<Self, ConvertError> {
        let cfg = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let cfg: ConverterConfig = cfg.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.block_size == 0 {
            return Err(ConvertError::Config("block_size must be greater than zero".into()));
        }
        Ok(())
    }
}
