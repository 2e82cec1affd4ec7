// Configuration loading

pub mod settings;

use std::fmt;
use std::path::PathBuf;

use provcheck_recon::ReconError;

pub use settings::{config_path, discover, load, load_from, write_default, ConfigSource};

#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Read { path: PathBuf, message: String },
    /// The file parsed badly or failed validation.
    Invalid { path: PathBuf, source: ReconError },
    /// Refused to overwrite an existing file.
    Exists(PathBuf),
    Write { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Invalid { path, source } if path.as_os_str().is_empty() => write!(f, "{source}"),
            Self::Invalid { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Exists(path) => write!(f, "{} already exists", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid { source, .. } => Some(source),
            _ => None,
        }
    }
}
