use std::{io, path::PathBuf};

/// Errores del crate: rutas y carpeta de salida
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No se pudo determinar el directorio base (HOME, XDG, etc)
    #[error(
        "Could not determine the project directory, the call to ProjectDirs failed, \
         the system probably does not provide a valid $HOME path."
    )]
    NoHome,

    /// La carpeta existe pero no se pueden crear ficheros dentro
    #[error("No write permission for {}", .0.display())]
    NotWritable(PathBuf),

    /// Un fichero concreto no se pudo borrar durante una purga
    #[error("Failed to delete {}: {source}", .path.display())]
    Cleanup { path: PathBuf, source: io::Error },

    /// Error de IO al crear o inspeccionar carpetas
    #[error(transparent)]
    Io(#[from] io::Error),
}
