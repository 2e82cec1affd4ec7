//! `provcheck inspect`: show how one workbook is normalized.

use std::path::PathBuf;

use provcheck_recon::facts::Normalizer;
use provcheck_recon::header::HeaderResolver;
use provcheck_recon::model::{DataQuality, HeaderOrigin, Side};
use provcheck_recon::schema::SchemaMapper;
use provcheck_recon::ReconError;
use serde::Serialize;

use crate::exit_codes::{EXIT_NOTHING_COMPARED, EXIT_SUCCESS};
use crate::{CliError, ConfigArgs};

#[derive(Serialize)]
struct SheetInfo {
    index: usize,
    rows: usize,
    width: usize,
}

#[derive(Serialize)]
struct InspectReport {
    file: String,
    side: Side,
    sheets: Vec<SheetInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<HeaderOrigin>,
    /// Column names as found in the file.
    columns: Vec<String>,
    /// Column names after synonym mapping.
    mapped: Vec<String>,
    measure_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<DataQuality>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
}

pub fn cmd_inspect(file: PathBuf, side: Side, config_args: &ConfigArgs, json_output: bool) -> Result<u8, CliError> {
    let config = config_args.resolve()?;
    let workbook = provcheck_io::read_workbook(&file).map_err(|e| {
        CliError::args(e.to_string()).with_hint("inspect reads xlsx, xlsm, xls, xlsb and ods files")
    })?;

    let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
    let mapper = SchemaMapper::new(&config.synonyms);
    let table = resolver.resolve_workbook(&workbook.sheets);

    let columns = table.as_ref().map(|t| t.columns.clone()).unwrap_or_default();
    let mapped = table.clone().map(|t| mapper.map(t).columns).unwrap_or_default();

    let (quality, missing) = match Normalizer::new(&config).normalize(&workbook, side) {
        Ok(facts) => (Some(facts.quality), Vec::new()),
        Err(ReconError::SchemaMismatch { missing, .. }) => (None, missing),
        Err(e) => return Err(CliError::args(e.to_string())),
    };

    let report = InspectReport {
        file: workbook.name.clone(),
        side,
        sheets: workbook
            .sheets
            .iter()
            .enumerate()
            .map(|(index, s)| SheetInfo { index, rows: s.rows.len(), width: s.width() })
            .collect(),
        header: table.as_ref().map(|t| t.origin),
        columns,
        mapped,
        measure_column: config.sides.get(side).measure_column().to_string(),
        quality,
        missing,
    };

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        print_text(&report);
    }

    Ok(if report.missing.is_empty() { EXIT_SUCCESS } else { EXIT_NOTHING_COMPARED })
}

fn print_text(report: &InspectReport) {
    println!("file:    {} ({} side)", report.file, report.side);
    for sheet in &report.sheets {
        println!("sheet {}: {} rows x {} columns", sheet.index, sheet.rows, sheet.width);
    }
    match report.header {
        Some(HeaderOrigin::Detected { source_row }) => println!("header:  row {}", source_row + 1),
        Some(_) | None => println!("header:  not found"),
    }
    for (source, mapped) in report.columns.iter().zip(&report.mapped) {
        if source == mapped {
            println!("  {source}");
        } else {
            println!("  {source} -> {mapped}");
        }
    }
    println!("measure: {}", report.measure_column);

    if let Some(q) = &report.quality {
        println!(
            "rows:    {} read, {} without ISIN, {} bad period, {} missing and {} bad measure, {} facts",
            q.rows_read, q.rows_missing_key, q.period_unparseable, q.measure_missing, q.measure_unparseable, q.facts
        );
    }
    if !report.missing.is_empty() {
        println!("missing: {}", report.missing.join(", "));
    }
}
