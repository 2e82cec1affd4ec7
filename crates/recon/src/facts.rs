//! Normalization of a loaded workbook into canonical facts.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};

use crate::config::{CanonicalField, ReconConfig};
use crate::error::ReconError;
use crate::header::HeaderResolver;
use crate::model::{CanonicalFact, CellValue, DataQuality, FactTable, Side, SourceWorkbook};
use crate::schema::SchemaMapper;
use crate::validate::filter_valid_rows;

/// Outcome of coercing a measure cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureValue {
    Value(f64),
    Missing,
    Unparseable,
}

pub fn coerce_measure(cell: &CellValue) -> MeasureValue {
    match cell {
        CellValue::Number(n) if n.is_finite() => MeasureValue::Value(*n),
        CellValue::Empty => MeasureValue::Missing,
        CellValue::Text(s) if s.trim().is_empty() => MeasureValue::Missing,
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => MeasureValue::Value(n),
            _ => MeasureValue::Unparseable,
        },
        _ => MeasureValue::Unparseable,
    }
}

/// Years a comparison workbook can hold as real dates.
const PERIOD_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

/// Coerce a period cell to a day. Text is tried against `formats` in order;
/// numbers are read as spreadsheet serial dates (1900 system). Days outside
/// 1900..=9999 are rejected: chrono's `%Y` reads `24` as year 24.
pub fn coerce_period(cell: &CellValue, formats: &[String]) -> Option<NaiveDate> {
    let day = match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => {
            let s = s.trim();
            formats.iter().find_map(|fmt| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
            })
        }
        CellValue::Number(n) => serial_to_date(*n),
        _ => None,
    };
    day.filter(|d| PERIOD_YEARS.contains(&d.year()))
}

/// Spreadsheet serial number to date, ignoring the time fraction.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    // 1899-12-30 absorbs the 1900 leap-year bug for serials after Feb 1900.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Header resolution, mapping, validation and coercion for one workbook.
pub struct Normalizer<'a> {
    config: &'a ReconConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a ReconConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, workbook: &SourceWorkbook, side: Side) -> Result<FactTable, ReconError> {
        let measure_column = self.config.sides.get(side).measure_column();
        let resolver = HeaderResolver::new(&self.config.synonyms, &self.config.period_parts);
        let mapper = SchemaMapper::new(&self.config.synonyms);

        let Some(table) = resolver.resolve_workbook(&workbook.sheets) else {
            return Err(ReconError::SchemaMismatch {
                file: workbook.name.clone(),
                missing: vec![
                    CanonicalField::Identifier.column_name().to_string(),
                    CanonicalField::Period.column_name().to_string(),
                    measure_column.to_string(),
                ],
            });
        };
        let table = mapper.map(table);

        let mut missing = SchemaMapper::missing_keys(&table);
        if !table.has_column(measure_column) {
            missing.push(measure_column.to_string());
        }
        if !missing.is_empty() {
            return Err(ReconError::SchemaMismatch {
                file: workbook.name.clone(),
                missing,
            });
        }

        let mut quality = DataQuality {
            rows_read: table.len(),
            ..Default::default()
        };

        let (table, dropped) = filter_valid_rows(table);
        quality.rows_missing_key = dropped;

        // Columns were checked above.
        let col = |name: &str| table.column_index(name).unwrap_or(usize::MAX);
        let id_idx = col(CanonicalField::Identifier.column_name());
        let period_idx = col(CanonicalField::Period.column_name());
        let measure_idx = col(measure_column);

        let mut facts = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let Some(period) = coerce_period(table.cell(row, period_idx), &self.config.date_formats) else {
                quality.period_unparseable += 1;
                continue;
            };
            let measure = match coerce_measure(table.cell(row, measure_idx)) {
                MeasureValue::Value(v) => v,
                MeasureValue::Missing => {
                    quality.measure_missing += 1;
                    continue;
                }
                MeasureValue::Unparseable => {
                    quality.measure_unparseable += 1;
                    continue;
                }
            };
            let identifier = table
                .cell(row, id_idx)
                .as_text()
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            facts.push(CanonicalFact { identifier, period, measure });
        }
        quality.facts = facts.len();

        log::info!(
            "normalized {side} file '{}': {} rows, {} facts",
            workbook.name,
            quality.rows_read,
            quality.facts
        );

        Ok(FactTable {
            source: workbook.name.clone(),
            facts,
            quality,
        })
    }
}
