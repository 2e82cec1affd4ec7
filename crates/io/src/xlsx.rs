// Spreadsheet import (xlsx, xlsm, xls, xlsb, ods) into raw cell grids.
//
// No header is assumed here: every sheet comes back as the grid calamine
// sees, and header detection happens in the recon crate.

use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use provcheck_recon::facts::serial_to_date;
use provcheck_recon::model::{Annotation, CellValue, RawTable, Side, SourceWorkbook};

use crate::error::IoError;

/// Display name of an input file: its final path component.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every sheet of a workbook on disk, in sheet order.
pub fn read_workbook(path: &Path) -> Result<SourceWorkbook, IoError> {
    let name = file_name(path);
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::Open {
        file: name.clone(),
        message: e.to_string(),
    })?;
    read_sheets(&mut workbook, name)
}

/// Read a workbook held in memory (e.g. an upload). The format is sniffed
/// from the content.
pub fn read_workbook_bytes(name: &str, bytes: Vec<u8>) -> Result<SourceWorkbook, IoError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| IoError::Open {
        file: name.to_string(),
        message: e.to_string(),
    })?;
    read_sheets(&mut workbook, name.to_string())
}

fn read_sheets<RS: Read + Seek>(workbook: &mut Sheets<RS>, name: String) -> Result<SourceWorkbook, IoError> {
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(|e| IoError::Sheet {
            file: name.clone(),
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

        // calamine trims leading empty rows/columns; restore them so row
        // indices match what a user sees in the sheet.
        let (top, left) = range.start().map_or((0, 0), |(r, c)| (r as usize, c as usize));
        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); top];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; left];
            cells.extend(row.iter().map(convert_cell));
            rows.push(cells);
        }
        if range.is_empty() {
            rows.clear();
        }

        log::info!("read '{name}' - '{sheet_name}': {} rows", rows.len());
        sheets.push(RawTable::new(rows));
    }

    Ok(SourceWorkbook { name, sheets })
}

/// Map a calamine cell to an untyped grid value.
pub fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => {
            // 1900 date system assumed; calamine does not expose the 1904 flag.
            let serial = dt.as_f64();
            serial_to_date(serial).map_or(CellValue::Number(serial), CellValue::Date)
        }
        Data::DateTimeIso(s) => parse_iso_date(s).map_or_else(|| CellValue::Text(s.clone()), CellValue::Date),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date()))
}

/// Read every path for one side. Unreadable files become `SourceRead`
/// annotations instead of aborting the batch.
pub fn load_sources(paths: &[PathBuf], side: Side) -> (Vec<SourceWorkbook>, Vec<Annotation>) {
    let mut workbooks = Vec::with_capacity(paths.len());
    let mut annotations = Vec::new();

    for path in paths {
        match read_workbook(path) {
            Ok(wb) => workbooks.push(wb),
            Err(e) => {
                log::warn!("skipping {side} file: {e}");
                annotations.push(Annotation::SourceRead {
                    side,
                    file: file_name(path),
                    message: e.to_string(),
                });
            }
        }
    }

    (workbooks, annotations)
}
