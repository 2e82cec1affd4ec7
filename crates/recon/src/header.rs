//! Header detection for raw spreadsheet grids.
//!
//! Vendor exports put banners, filter summaries and blank lines above the
//! real header row, so the header is located by content: the first row that
//! contains any known synonym wins.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::{PeriodParts, SynonymTable};
use crate::model::{CellValue, HeaderOrigin, RawTable, SchemaTable};

/// Column positions of a month/year pair inside a raw grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodPartsColumns {
    pub month: usize,
    pub year: usize,
    /// Index at which the synthesized date column is written.
    pub target: usize,
}

pub struct HeaderResolver<'a> {
    synonyms: &'a SynonymTable,
    period_parts: &'a PeriodParts,
}

impl<'a> HeaderResolver<'a> {
    pub fn new(synonyms: &'a SynonymTable, period_parts: &'a PeriodParts) -> Self {
        Self { synonyms, period_parts }
    }

    /// Promote the first row holding a known header label. Rows above it
    /// are dropped.
    pub fn resolve(&self, raw: RawTable) -> SchemaTable {
        self.ensure_header(SchemaTable::positional(raw))
    }

    /// No-op for tables whose header is already resolved.
    pub fn ensure_header(&self, table: SchemaTable) -> SchemaTable {
        if table.origin.is_resolved() {
            return table;
        }

        let header_idx = table.rows.iter().position(|row| {
            row.iter()
                .filter_map(|c| c.as_text())
                .any(|s| self.synonyms.contains(s.trim()))
        });

        let Some(header_idx) = header_idx else {
            return table;
        };

        // Banner rows above the header are not data.
        let mut rows = table.rows;
        let header_row = rows.drain(..=header_idx).last().unwrap_or_default();
        SchemaTable {
            columns: column_names(&header_row),
            rows,
            origin: HeaderOrigin::Detected { source_row: header_idx },
        }
    }

    /// Resolve every sheet of a workbook into one table.
    ///
    /// Only the first non-empty sheet runs header detection; later sheets are
    /// treated as pure data under the same columns.
    pub fn resolve_workbook(&self, sheets: &[RawTable]) -> Option<SchemaTable> {
        let mut sheets = sheets.iter().filter(|s| !s.is_empty());

        let mut first = sheets.next()?.clone();
        let parts = self.apply_period_parts(&mut first);
        let mut table = self.resolve(first);

        for sheet in sheets {
            let mut sheet = sheet.clone();
            if let Some(cols) = parts {
                self.synthesize_period(&mut sheet, None, cols);
            }
            let continuation = SchemaTable::inherited(table.columns.clone(), sheet);
            table.rows.extend(continuation.rows);
        }

        Some(table)
    }

    /// Locate a row holding both the month and year labels.
    pub fn locate_period_parts(&self, raw: &RawTable) -> Option<(usize, PeriodPartsColumns)> {
        if !self.period_parts.enabled {
            return None;
        }
        let target = raw.width();
        raw.rows.iter().enumerate().find_map(|(row_idx, row)| {
            let find = |label: &str| {
                row.iter()
                    .position(|c| c.as_text().is_some_and(|s| s.trim() == label))
            };
            let month = find(self.period_parts.month.as_str())?;
            let year = find(self.period_parts.year.as_str())?;
            Some((row_idx, PeriodPartsColumns { month, year, target }))
        })
    }

    /// Detect a month/year pair and append a synthesized date column.
    pub fn apply_period_parts(&self, raw: &mut RawTable) -> Option<PeriodPartsColumns> {
        let (label_row, cols) = self.locate_period_parts(raw)?;
        self.synthesize_period(raw, Some(label_row), cols);
        Some(cols)
    }

    /// Write the synthesized column. Rows after `label_row` (all rows when
    /// `None`) get the first day of their month; the label row gets the label.
    pub fn synthesize_period(&self, raw: &mut RawTable, label_row: Option<usize>, cols: PeriodPartsColumns) {
        for (idx, row) in raw.rows.iter_mut().enumerate() {
            let value = match label_row {
                Some(l) if idx == l => CellValue::text(self.period_parts.label.clone()),
                Some(l) if idx < l => CellValue::Empty,
                _ => {
                    let month = row.get(cols.month).and_then(cell_int);
                    let year = row.get(cols.year).and_then(cell_int);
                    match (month, year) {
                        (Some(m), Some(y)) => month_start(m, y).map(CellValue::Date).unwrap_or(CellValue::Empty),
                        _ => CellValue::Empty,
                    }
                }
            };
            if row.len() < cols.target {
                row.resize(cols.target, CellValue::Empty);
            }
            if row.len() == cols.target {
                row.push(value);
            } else {
                row[cols.target] = value;
            }
        }
    }
}

/// Header cells become unique column names.
fn column_names(header: &[CellValue]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let label = cell.to_label();
            let base = if label.is_empty() { format!("Unnamed: {i}") } else { label };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 { base.clone() } else { format!("{base}.{count}") };
            *count += 1;
            name
        })
        .collect()
}

fn cell_int(cell: &CellValue) -> Option<i64> {
    let n = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.fract() == 0.0).then_some(n as i64)
}

fn month_start(month: i64, year: i64) -> Option<NaiveDate> {
    let month = u32::try_from(month).ok()?;
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn banner_grid() -> RawTable {
        RawTable::new(vec![
            vec![t("Provisionsabrechnung Q1"), CellValue::Empty, CellValue::Empty],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
            vec![t("ISIN"), t("Datum"), t("Provision")],
            vec![t("DE0001"), t("01.01.2024"), n(100.0)],
            vec![t("DE0002"), t("01.02.2024"), n(50.0)],
        ])
    }

    #[test]
    fn promotes_first_row_with_synonym() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let table = resolver.resolve(banner_grid());

        assert_eq!(table.columns, vec!["ISIN", "Datum", "Provision"]);
        assert_eq!(table.origin, HeaderOrigin::Detected { source_row: 2 });
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], t("DE0001"));
    }

    #[test]
    fn no_header_row_degrades_to_positional() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let raw = RawTable::new(vec![vec![t("a"), t("b")], vec![n(1.0), n(2.0)]]);
        let table = resolver.resolve(raw);

        assert_eq!(table.origin, HeaderOrigin::Positional);
        assert_eq!(table.columns, vec!["0", "1"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn resolving_twice_is_a_noop() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        // A data row that happens to contain a synonym must not be re-promoted.
        let raw = RawTable::new(vec![
            vec![t("ISIN"), t("Fee")],
            vec![t("DE0001"), n(1.0)],
            vec![t("Provision"), n(2.0)],
        ]);
        let once = resolver.resolve(raw);
        let twice = resolver.ensure_header(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.rows.len(), 2);
    }

    #[test]
    fn blank_and_duplicate_header_cells_get_unique_names() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let raw = RawTable::new(vec![
            vec![t("ISIN"), CellValue::Empty, t("Fee"), t("Fee")],
            vec![t("DE0001"), n(1.0), n(2.0), n(3.0)],
        ]);
        let table = resolver.resolve(raw);
        assert_eq!(table.columns, vec!["ISIN", "Unnamed: 1", "Fee", "Fee.1"]);
    }

    #[test]
    fn month_and_year_columns_synthesize_date() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let mut raw = RawTable::new(vec![
            vec![t("Report")],
            vec![t("ISIN"), t("Statement Month"), t("Statement Year"), t("Fee")],
            vec![t("DE0001"), n(3.0), n(2024.0), n(12.5)],
            vec![t("DE0002"), t("11"), t("2023"), n(7.0)],
            vec![t("DE0003"), t("13"), t("2023"), n(7.0)],
        ]);
        let cols = resolver.apply_period_parts(&mut raw).unwrap();
        assert_eq!(cols, PeriodPartsColumns { month: 1, year: 2, target: 4 });

        let table = resolver.resolve(raw);
        assert_eq!(table.columns, vec!["ISIN", "Statement Month", "Statement Year", "Fee", "Date"]);
        assert_eq!(table.rows[0][4], CellValue::Date(date(2024, 3, 1)));
        assert_eq!(table.rows[1][4], CellValue::Date(date(2023, 11, 1)));
        assert_eq!(table.rows[2][4], CellValue::Empty);
    }

    #[test]
    fn period_parts_can_be_disabled() {
        let mut config = ReconConfig::default();
        config.period_parts.enabled = false;
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let mut raw = RawTable::new(vec![vec![t("Statement Month"), t("Statement Year")]]);
        assert!(resolver.apply_period_parts(&mut raw).is_none());
        assert_eq!(raw.width(), 2);
    }

    #[test]
    fn later_sheets_inherit_first_sheet_header() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let sheet2 = RawTable::new(vec![
            vec![t("DE0003"), t("01.03.2024"), n(25.0)],
            vec![t("DE0004"), t("01.03.2024")],
        ]);
        let table = resolver
            .resolve_workbook(&[banner_grid(), RawTable::default(), sheet2])
            .unwrap();

        assert_eq!(table.columns, vec!["ISIN", "Datum", "Provision"]);
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[2][0], t("DE0003"));
        assert_eq!(table.rows[3], vec![t("DE0004"), t("01.03.2024"), CellValue::Empty]);
    }

    #[test]
    fn later_sheets_reuse_period_part_positions() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        let sheet1 = RawTable::new(vec![
            vec![t("ISIN"), t("Statement Month"), t("Statement Year"), t("Fee")],
            vec![t("DE0001"), n(1.0), n(2024.0), n(10.0)],
        ]);
        let sheet2 = RawTable::new(vec![vec![t("DE0001"), n(2.0), n(2024.0), n(20.0)]]);
        let table = resolver.resolve_workbook(&[sheet1, sheet2]).unwrap();

        assert_eq!(table.columns.last().map(String::as_str), Some("Date"));
        assert_eq!(table.rows[1][4], CellValue::Date(date(2024, 2, 1)));
    }

    #[test]
    fn workbook_without_data_resolves_to_none() {
        let config = ReconConfig::default();
        let resolver = HeaderResolver::new(&config.synonyms, &config.period_parts);
        assert!(resolver.resolve_workbook(&[RawTable::default()]).is_none());
    }
}
