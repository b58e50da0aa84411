use std::{
    ffi::OsStr,
    fs::{self, OpenOptions},
    io,
    path::Path,
};

use tracing::{Level, instrument};
use uuid::Uuid;

use crate::errors::Error;

/// Extensión (sin punto) de todos los ficheros que genera este crate.
pub const WAV_EXTENSION: &str = "wav";

/// Asegura que la carpeta `path` existe (creándola recursivamente si hace falta).
///
/// `create_dir_all` ya trata "ya existe" como éxito, así que dos llamadas
/// concurrentes terminan ambas en `Ok(())`.
#[instrument(level = Level::TRACE, err)]
pub fn ensure_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Verifica que se pueden crear ficheros dentro de la carpeta `path`.
///
/// No se fía de los bits de permisos: crea y borra un fichero temporal, así
/// que ACLs, montajes de solo lectura y root dan la respuesta real.
#[instrument(level = Level::TRACE, err)]
pub fn check_writable(path: &Path) -> Result<(), Error> {
    if !fs::metadata(path)?.is_dir() {
        return Err(Error::NotWritable(path.to_path_buf()));
    }

    // `.tmp` para que una purga concurrente no lo confunda con un WAV
    let scratch = path.join(format!(".wavport-{}.tmp", Uuid::new_v4()));
    match OpenOptions::new().write(true).create_new(true).open(&scratch) {
        Ok(file) => {
            drop(file);
            fs::remove_file(&scratch)?;
            Ok(())
        }
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem
            ) =>
        {
            Err(Error::NotWritable(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// `true` si `path` termina en `.wav`, sin distinguir mayúsculas.
pub fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(WAV_EXTENSION))
}

/// Borra un único fichero.
#[instrument(level = Level::TRACE, err)]
pub fn remove_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}
