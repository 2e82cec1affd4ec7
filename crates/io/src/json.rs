// JSON export of a run report

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use provcheck_recon::model::RunReport;

use crate::error::IoError;

/// Write the run report as pretty-printed JSON.
pub fn export_report(report: &RunReport, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.to_path_buf(),
        message,
    };
    let file = File::create(path).map_err(|e| write_err(e.to_string()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report).map_err(|e| write_err(e.to_string()))?;
    Ok(())
}
