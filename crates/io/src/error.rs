use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum IoError {
    /// Workbook could not be opened or its container is unreadable.
    Open { file: String, message: String },
    /// A single sheet could not be decoded.
    Sheet { file: String, sheet: String, message: String },
    /// Output could not be built or saved.
    Write { path: PathBuf, message: String },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { file, message } => write!(f, "cannot open '{file}': {message}"),
            Self::Sheet { file, sheet, message } => {
                write!(f, "cannot read sheet '{sheet}' of '{file}': {message}")
            }
            Self::Write { path, message } => write!(f, "cannot write '{}': {message}", path.display()),
        }
    }
}

impl std::error::Error for IoError {}
