// Comparison workbook export.
//
// One workbook per compared pair with a `Summary` and a `Detail` sheet.
// Out-of-band differences are highlighted with conditional formats rather
// than static fills, so the workbook re-evaluates if a value is edited.

use std::path::{Path, PathBuf};

use chrono::Datelike;
use provcheck_recon::config::{ToleranceBand, ToleranceConfig};
use provcheck_recon::model::{Annotation, ComparisonResult, ComparisonRow};
use rust_xlsxwriter::{
    Color, ConditionalFormatCell, ConditionalFormatCellRule, ExcelDateTime, Format, Workbook, Worksheet,
    XlsxError,
};

use crate::error::IoError;

const SUMMARY_HEADERS: [&str; 5] = ["ISIN", "Fundline Total", "Partner Total", "Difference", "Flag"];
const DETAIL_HEADERS: [&str; 6] = ["ISIN", "Period", "Fundline Total", "Partner Total", "Difference", "Flag"];
const DATE_FORMAT: &str = "dd.mm.yyyy";
const HIGHLIGHT: u32 = 0xFF0000;

fn stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

/// `{fundline}_{partner}_comparison.xlsx`, using both names without extension.
pub fn comparison_file_name(fundline: &str, partner: &str) -> String {
    format!("{}_{}_comparison.xlsx", stem(fundline), stem(partner))
}

/// Build the comparison workbook in memory.
pub fn build_workbook(result: &ComparisonResult, tolerance: &ToleranceConfig) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date = Format::new().set_num_format(DATE_FORMAT);

    let sheet = workbook.add_worksheet().set_name("Summary")?;
    write_headers(sheet, &SUMMARY_HEADERS, &header)?;
    for (i, row) in result.summary.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, &row.identifier)?;
        write_totals(sheet, r, 1, row)?;
    }
    highlight_differences(sheet, result.summary.len(), 3, &tolerance.summary)?;

    let sheet = workbook.add_worksheet().set_name("Detail")?;
    write_headers(sheet, &DETAIL_HEADERS, &header)?;
    for (i, row) in result.detail.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, &row.identifier)?;
        if let Some(period) = row.period {
            let dt = ExcelDateTime::from_ymd(period.year() as u16, period.month() as u8, period.day() as u8)?;
            sheet.write_datetime_with_format(r, 1, &dt, &date)?;
        }
        write_totals(sheet, r, 2, row)?;
    }
    highlight_differences(sheet, result.detail.len(), 4, &tolerance.detail)?;

    Ok(workbook)
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, format)?;
        sheet.set_column_width(col as u16, 16)?;
    }
    Ok(())
}

/// Fundline total, partner total, difference and flag from `col` onwards.
fn write_totals(sheet: &mut Worksheet, row: u32, col: u16, data: &ComparisonRow) -> Result<(), XlsxError> {
    sheet.write_number(row, col, data.fundline_total)?;
    sheet.write_number(row, col + 1, data.partner_total)?;
    sheet.write_number(row, col + 2, data.difference)?;
    sheet.write_string(row, col + 3, data.flag.to_string())?;
    Ok(())
}

fn highlight_differences(
    sheet: &mut Worksheet,
    rows: usize,
    col: u16,
    band: &ToleranceBand,
) -> Result<(), XlsxError> {
    if rows == 0 {
        return Ok(());
    }
    let red = Format::new().set_background_color(Color::RGB(HIGHLIGHT));
    let last = rows as u32;

    let below = ConditionalFormatCell::new()
        .set_rule(ConditionalFormatCellRule::LessThan(band.lower))
        .set_format(&red);
    sheet.add_conditional_format(1, col, last, col, &below)?;

    let above = ConditionalFormatCell::new()
        .set_rule(ConditionalFormatCellRule::GreaterThan(band.upper))
        .set_format(&red);
    sheet.add_conditional_format(1, col, last, col, &above)?;
    Ok(())
}

/// Write the comparison workbook for one pair into `dir`.
pub fn write_comparison(result: &ComparisonResult, tolerance: &ToleranceConfig, dir: &Path) -> Result<PathBuf, IoError> {
    let path = dir.join(comparison_file_name(&result.fundline, &result.partner));
    let write_err = |e: XlsxError| IoError::Write {
        path: path.clone(),
        message: e.to_string(),
    };

    let mut workbook = build_workbook(result, tolerance).map_err(write_err)?;
    workbook.save(&path).map_err(write_err)?;

    log::info!("wrote '{}'", path.display());
    Ok(path)
}

/// Write one workbook per comparison that has data. Pairs with an empty
/// intersection produce no file. A pair whose workbook cannot be written
/// becomes a `ReportWriteFailed` annotation and the others are still
/// written; only an unusable output directory is an error.
pub fn write_reports(
    results: &[ComparisonResult],
    tolerance: &ToleranceConfig,
    dir: &Path,
) -> Result<(Vec<PathBuf>, Vec<Annotation>), IoError> {
    std::fs::create_dir_all(dir).map_err(|e| IoError::Write {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut written = Vec::new();
    let mut annotations = Vec::new();
    for result in results.iter().filter(|r| !r.is_empty_intersection()) {
        match write_comparison(result, tolerance, dir) {
            Ok(path) => written.push(path),
            Err(e) => {
                log::warn!("{e}");
                annotations.push(Annotation::ReportWriteFailed {
                    fundline: result.fundline.clone(),
                    partner: result.partner.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    Ok((written, annotations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::NaiveDate;
    use provcheck_recon::model::{ComparisonOutcome, ComparisonStats, DataQuality, ToleranceFlag};

    fn row(id: &str, period: Option<NaiveDate>, f: f64, p: f64, flag: ToleranceFlag) -> ComparisonRow {
        ComparisonRow {
            identifier: id.into(),
            period,
            fundline_total: f,
            partner_total: p,
            difference: p - f,
            flag,
        }
    }

    fn result(outcome: ComparisonOutcome) -> ComparisonResult {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1);
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1);
        let (detail, summary) = match outcome {
            ComparisonOutcome::Overlap => (
                vec![
                    row("DE0001", jan, 100.0, 110.0, ToleranceFlag::WithinTolerance),
                    row("DE0001", feb, 50.0, 20.0, ToleranceFlag::BelowThreshold),
                ],
                vec![row("DE0001", None, 150.0, 130.0, ToleranceFlag::WithinTolerance)],
            ),
            ComparisonOutcome::EmptyIntersection => (vec![], vec![]),
        };
        ComparisonResult {
            fundline: "Q1_Report_ABC.xlsx".into(),
            partner: "ABC_Report_Q1.xlsx".into(),
            outcome,
            detail,
            summary,
            detail_stats: ComparisonStats::default(),
            summary_stats: ComparisonStats::default(),
            fundline_quality: DataQuality::default(),
            partner_quality: DataQuality::default(),
        }
    }

    #[test]
    fn file_name_uses_both_stems() {
        assert_eq!(
            comparison_file_name("Q1_Report_ABC.xlsx", "ABC_Report_Q1.xlsm"),
            "Q1_Report_ABC_ABC_Report_Q1_comparison.xlsx"
        );
    }

    #[test]
    fn written_workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_comparison(&result(ComparisonOutcome::Overlap), &ToleranceConfig::default(), dir.path()).unwrap();
        assert!(path.ends_with("Q1_Report_ABC_ABC_Report_Q1_comparison.xlsx"));

        let mut wb = open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Summary".to_string(), "Detail".to_string()]);

        let summary = wb.worksheet_range("Summary").unwrap();
        assert_eq!(summary.get_size(), (2, 5));
        assert_eq!(summary.get((0, 3)), Some(&Data::String("Difference".into())));
        assert_eq!(summary.get((1, 3)), Some(&Data::Float(-20.0)));
        assert_eq!(summary.get((1, 4)), Some(&Data::String("within_tolerance".into())));

        let detail = wb.worksheet_range("Detail").unwrap();
        assert_eq!(detail.get_size(), (3, 6));
        match detail.get((2, 1)) {
            Some(Data::DateTime(dt)) => assert_eq!(dt.as_f64(), 45323.0),
            other => panic!("expected a date cell, got {other:?}"),
        }
        assert_eq!(detail.get((2, 4)), Some(&Data::Float(-30.0)));
        assert_eq!(detail.get((2, 5)), Some(&Data::String("below_threshold".into())));
    }

    #[test]
    fn empty_intersections_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let (written, notes) = write_reports(
            &[result(ComparisonOutcome::EmptyIntersection), result(ComparisonOutcome::Overlap)],
            &ToleranceConfig::default(),
            &out,
        )
        .unwrap();
        assert_eq!(written.len(), 1);
        assert!(notes.is_empty());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn failed_pair_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let mut broken = result(ComparisonOutcome::Overlap);
        broken.fundline = "a_q1.xlsx".into();
        broken.partner = "a_q1.xlsx".into();
        // Excel cannot store year 24.
        broken.detail[0].period = NaiveDate::from_ymd_opt(24, 1, 31);
        let mut healthy = result(ComparisonOutcome::Overlap);
        healthy.fundline = "b_q1.xlsx".into();
        healthy.partner = "b_q1.xlsx".into();

        let (written, notes) =
            write_reports(&[broken, healthy], &ToleranceConfig::default(), dir.path()).unwrap();

        assert_eq!(written, vec![dir.path().join("b_q1_b_q1_comparison.xlsx")]);
        assert!(written[0].exists());
        assert_eq!(notes.len(), 1);
        match &notes[0] {
            Annotation::ReportWriteFailed { fundline, message, .. } => {
                assert_eq!(fundline, "a_q1.xlsx");
                assert!(message.contains("a_q1_a_q1_comparison.xlsx"), "{message}");
            }
            other => panic!("unexpected note: {other}"),
        }
    }

    #[test]
    fn empty_sheets_still_build() {
        let wb = build_workbook(&result(ComparisonOutcome::EmptyIntersection), &ToleranceConfig::default());
        assert!(wb.is_ok());
    }
}
