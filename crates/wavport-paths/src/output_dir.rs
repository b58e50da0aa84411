use std::{
    fs, io,
    path::{Path, PathBuf},
};

use sugar_path::SugarPath;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    errors::Error,
    fs_utils::{self, WAV_EXTENSION},
};

/// Carpeta que se crea bajo la raíz de usuario para los ficheros convertidos.
pub const CONVERTED_DIR_NAME: &str = "converted";

/// Nombre base cuando la entrada no tiene un nombre de fichero usable.
const FALLBACK_STEM: &str = "audio";

/// Carpeta dueña de todos los WAV que produce el conversor.
///
/// Los ficheros cuelgan directamente de ella, nunca de subcarpetas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirectory {
    path: PathBuf,
}

/// Resultado de [`OutputDirectory::purge_wavs`].
#[derive(Debug, Default)]
pub struct PurgeReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<Error>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl OutputDirectory {
    /// Las rutas relativas se anclan al directorio actual aquí, una sola vez:
    /// todo lo que se devuelva después es absoluto.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into().absolutize(),
        }
    }

    /// `<user_root>/converted`
    pub fn under(user_root: &Path) -> Self {
        Self::new(user_root.join(CONVERTED_DIR_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Crea la carpeta si falta y comprueba que se puede escribir en ella.
    /// Se puede llamar cuantas veces haga falta, desde cualquier hilo.
    pub fn ensure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.path)?;
        fs_utils::check_writable(&self.path)?;
        Ok(())
    }

    /// Devuelve `<dir>/<stem>_<uuid>.wav`. No crea nada en disco.
    pub fn unique_wav_path(&self, stem: &str) -> PathBuf {
        let stem = stem.trim();
        let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
        let token = Uuid::new_v4();
        self.path.join(format!("{stem}_{token}.{WAV_EXTENSION}"))
    }

    /// Borra todos los `.wav` que cuelgan directamente de la carpeta.
    ///
    /// Si un fichero no se puede borrar queda anotado en el informe y la purga
    /// sigue con el resto.
    pub fn purge_wavs(&self) -> PurgeReport {
        self.purge_with(fs_utils::remove_file)
    }

    pub(crate) fn purge_with<F>(&self, mut remove: F) -> PurgeReport
    where
        F: FnMut(&Path) -> io::Result<()>,
    {
        let mut report = PurgeReport::default();

        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %self.path.display(), "output directory missing, nothing to purge");
                return report;
            }
            Err(source) => {
                report.failures.push(Error::Cleanup {
                    path: self.path.clone(),
                    source,
                });
                return report;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(dir = %self.path.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            if !path.is_file() || !fs_utils::has_wav_extension(&path) {
                continue;
            }

            match remove(&path) {
                Ok(()) => report.removed.push(path),
                Err(source) => {
                    let err = Error::Cleanup { path, source };
                    warn!("{err}");
                    report.failures.push(err);
                }
            }
        }

        debug!(
            removed = report.removed.len(),
            failed = report.failures.len(),
            "purge finished"
        );
        report
    }
}
