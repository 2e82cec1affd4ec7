use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty synonym list, inverted band, etc.).
    ConfigValidation(String),
    /// Required canonical columns absent after mapping.
    SchemaMismatch { file: String, missing: Vec<String> },
    /// Executor could not complete a pair comparison.
    Executor(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SchemaMismatch { file, missing } => {
                write!(f, "'{file}': missing column(s) {}", missing.join(", "))
            }
            Self::Executor(msg) => write!(f, "executor error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
