//! Crate `wavport_paths`: resolución de rutas y carpeta de salida gestionada

mod errors;
mod fs_utils;
mod output_dir;
mod resolve;

pub use errors::Error;
pub use fs_utils::{WAV_EXTENSION, has_wav_extension};
pub use output_dir::{CONVERTED_DIR_NAME, OutputDirectory, PurgeReport};
pub use resolve::{ENV_BASE_DIR, PathResolver, RES_SCHEME, SchemeResolver, USER_SCHEME, default_user_root};
