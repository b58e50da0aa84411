use std::{
    env,
    path::{Component, Path, PathBuf},
};

use directories::ProjectDirs;
use sugar_path::SugarPath;

use crate::errors::Error;

/// ENV var para sobreescribir la raíz de datos de usuario (modo "portable").
pub const ENV_BASE_DIR: &str = "WAVPORT_BASE_DIR";

pub const RES_SCHEME: &str = "res://";
pub const USER_SCHEME: &str = "user://";

/// Convierte cualquier forma de ruta que nos pasen en una ruta absoluta del sistema.
pub trait PathResolver {
    fn resolve(&self, input: &str) -> PathBuf;
}

impl<F> PathResolver for F
where
    F: Fn(&str) -> PathBuf,
{
    fn resolve(&self, input: &str) -> PathBuf {
        self(input)
    }
}

/// Raíz de las rutas `user://`: `$WAVPORT_BASE_DIR` si existe, si no la carpeta de datos de la plataforma.
pub fn default_user_root() -> Result<PathBuf, Error> {
    if let Some(base) = env::var_os(ENV_BASE_DIR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(base).absolutize());
    }
    let proj = ProjectDirs::from("com", "Wavport", "wavport").ok_or(Error::NoHome)?;
    Ok(proj.data_dir().to_path_buf())
}

/// Traduce `res://` y `user://` a dos raíces y hace absoluto todo lo demás
/// respecto al directorio actual. Puramente léxico: el destino no tiene que existir.
#[derive(Debug, Clone)]
pub struct SchemeResolver {
    resource_root: PathBuf,
    user_root: PathBuf,
}

impl SchemeResolver {
    pub fn new(resource_root: impl AsRef<Path>, user_root: impl AsRef<Path>) -> Self {
        Self {
            resource_root: resource_root.as_ref().absolutize(),
            user_root: user_root.as_ref().absolutize(),
        }
    }

    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    pub fn user_root(&self) -> &Path {
        &self.user_root
    }

    /// Inversa de la resolución `user://`. Lo que queda fuera de la raíz vuelve tal cual.
    pub fn to_user_path(&self, absolute: &Path) -> String {
        match absolute.strip_prefix(&self.user_root) {
            Ok(rel) => {
                let parts: Vec<_> = rel
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy()),
                        _ => None,
                    })
                    .collect();
                format!("{USER_SCHEME}{}", parts.join("/"))
            }
            Err(_) => absolute.to_string_lossy().into_owned(),
        }
    }
}

fn join_under(root: &Path, rest: &str) -> PathBuf {
    root.join(rest.trim_start_matches(['/', '\\'])).normalize()
}

impl PathResolver for SchemeResolver {
    fn resolve(&self, input: &str) -> PathBuf {
        if let Some(rest) = input.strip_prefix(RES_SCHEME) {
            join_under(&self.resource_root, rest)
        } else if let Some(rest) = input.strip_prefix(USER_SCHEME) {
            join_under(&self.user_root, rest)
        } else {
            Path::new(input).absolutize()
        }
    }
}
