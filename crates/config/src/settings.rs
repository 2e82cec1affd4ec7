// Configuration file discovery
// Looked up from --config, then $PROVCHECK_CONFIG, then ~/.config/provcheck/provcheck.toml

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use provcheck_recon::ReconConfig;

use crate::ConfigError;

/// Environment variable naming a config file.
pub const ENV_VAR: &str = "PROVCHECK_CONFIG";

/// Get the per-user config file path
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("provcheck");
    config_dir.join("provcheck.toml")
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config PATH`
    Explicit(PathBuf),
    /// `$PROVCHECK_CONFIG`
    Env(PathBuf),
    /// The per-user file, which exists.
    User(PathBuf),
    /// Built-in synonym dictionary and thresholds.
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Env(p) | Self::User(p) => Some(p.as_path()),
            Self::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "{} (--config)", p.display()),
            Self::Env(p) => write!(f, "{} (${ENV_VAR})", p.display()),
            Self::User(p) => write!(f, "{}", p.display()),
            Self::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// Pick a config source. Explicit and env paths are returned even if they
/// don't exist, so a typo surfaces as a read error; the per-user file only
/// counts when present.
pub fn discover_with(explicit: Option<&Path>, env: Option<PathBuf>, user: PathBuf) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return ConfigSource::Env(path);
    }
    if user.is_file() {
        return ConfigSource::User(user);
    }
    ConfigSource::Defaults
}

pub fn discover(explicit: Option<&Path>) -> ConfigSource {
    discover_with(explicit, std::env::var_os(ENV_VAR).map(PathBuf::from), config_path())
}

/// Read and validate the config named by `source`.
pub fn load_from(source: &ConfigSource) -> Result<ReconConfig, ConfigError> {
    let Some(path) = source.path() else {
        return Ok(ReconConfig::default());
    };
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    ReconConfig::from_toml(&contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Discover and load in one step.
pub fn load(explicit: Option<&Path>) -> Result<(ReconConfig, ConfigSource), ConfigError> {
    let source = discover(explicit);
    let config = load_from(&source)?;
    log::info!("using configuration from {source}");
    Ok((config, source))
}

const DEFAULT_HEADER: &str = "\
# provcheck configuration
#
# Every section is optional. Synonym lists are matched against trimmed header
# cells in the order given; the first alias present in a file wins.
# Differences are partner total minus Fundline total.

";

/// Default configuration as commented TOML.
pub fn default_toml() -> Result<String, ConfigError> {
    let body = ReconConfig::default().to_toml().map_err(|e| ConfigError::Invalid {
        path: PathBuf::new(),
        source: e,
    })?;
    Ok(format!("{DEFAULT_HEADER}{body}"))
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::Exists(path.to_path_buf()));
    }

    let write_err = |e: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, default_toml()?).map_err(write_err)
}
