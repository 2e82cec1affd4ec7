use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// Untyped cell content as read from a spreadsheet grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date/time cells are truncated to the day on read.
    Date(NaiveDate),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Label used when a cell is promoted to a column name.
    pub fn to_label(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => format!("{n}"),
            Self::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_label())
    }
}

/// A sheet's raw grid before any header is assumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Where a table's column names came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderOrigin {
    /// Promoted from this raw row index of the first sheet.
    Detected { source_row: usize },
    /// Reused from the first sheet of the same workbook.
    Inherited,
    /// No header row found; columns are named by position.
    Positional,
}

impl HeaderOrigin {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Positional)
    }
}

/// Rows aligned to named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub origin: HeaderOrigin,
}

impl SchemaTable {
    /// Wrap a raw grid with positional column names ("0", "1", ...).
    pub fn positional(raw: RawTable) -> Self {
        let width = raw.width();
        let columns = (0..width).map(|i| i.to_string()).collect();
        let rows = raw.rows.into_iter().map(|r| pad_row(r, width)).collect();
        Self { columns, rows, origin: HeaderOrigin::Positional }
    }

    /// Treat every row of `raw` as data under already-known columns.
    pub fn inherited(columns: Vec<String>, raw: RawTable) -> Self {
        let width = columns.len();
        let rows = raw.rows.into_iter().map(|r| pad_row(r, width)).collect();
        Self { columns, rows, origin: HeaderOrigin::Inherited }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pad with `Empty` or truncate so the row has exactly `width` cells.
fn pad_row(mut row: Vec<CellValue>, width: usize) -> Vec<CellValue> {
    row.resize(width, CellValue::Empty);
    row
}

/// A loaded workbook: its file name plus one raw grid per sheet, in sheet order.
#[derive(Debug, Clone, Default)]
pub struct SourceWorkbook {
    pub name: String,
    pub sheets: Vec<RawTable>,
}

// ---------------------------------------------------------------------------
// Canonical facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFact {
    pub identifier: String,
    pub period: NaiveDate,
    pub measure: f64,
}

/// Per-file data-quality counters from normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    pub rows_read: usize,
    pub rows_missing_key: usize,
    pub period_unparseable: usize,
    pub measure_missing: usize,
    pub measure_unparseable: usize,
    pub facts: usize,
}

impl DataQuality {
    /// Values dropped because they could not be coerced.
    pub fn coercion_drops(&self) -> usize {
        self.period_unparseable + self.measure_unparseable
    }
}

/// Normalized content of one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactTable {
    pub source: String,
    pub facts: Vec<CanonicalFact>,
    pub quality: DataQuality,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Per (identifier, period).
    Detail,
    /// Per identifier across all periods.
    Summary,
}

/// Grouping key. `period` is `None` at summary granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateKey {
    pub identifier: String,
    pub period: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<NaiveDate>,
    pub total: f64,
    pub record_count: usize,
}

impl AggregateRow {
    pub fn key(&self) -> AggregateKey {
        AggregateKey {
            identifier: self.identifier.clone(),
            period: self.period,
        }
    }
}

// ---------------------------------------------------------------------------
// File matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub fundline: String,
    pub partner: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unmatched {
    pub fundline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileMatchOutput {
    pub pairs: Vec<MatchedPair>,
    pub unmatched: Vec<Unmatched>,
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceFlag {
    WithinTolerance,
    BelowThreshold,
    AboveThreshold,
}

impl ToleranceFlag {
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Self::WithinTolerance)
    }
}

impl fmt::Display for ToleranceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithinTolerance => write!(f, "within_tolerance"),
            Self::BelowThreshold => write!(f, "below_threshold"),
            Self::AboveThreshold => write!(f, "above_threshold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<NaiveDate>,
    pub fundline_total: f64,
    pub partner_total: f64,
    /// partner_total - fundline_total
    pub difference: f64,
    pub flag: ToleranceFlag,
}

/// Counts for one granularity of one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonStats {
    pub joined: usize,
    pub within: usize,
    pub below: usize,
    pub above: usize,
    pub fundline_only: usize,
    pub partner_only: usize,
}

impl ComparisonStats {
    pub fn flagged(&self) -> usize {
        self.below + self.above
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Overlap,
    /// The pair shares no (identifier, period) keys.
    EmptyIntersection,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub fundline: String,
    pub partner: String,
    pub outcome: ComparisonOutcome,
    pub detail: Vec<ComparisonRow>,
    pub summary: Vec<ComparisonRow>,
    pub detail_stats: ComparisonStats,
    pub summary_stats: ComparisonStats,
    pub fundline_quality: DataQuality,
    pub partner_quality: DataQuality,
}

impl ComparisonResult {
    pub fn is_empty_intersection(&self) -> bool {
        self.outcome == ComparisonOutcome::EmptyIntersection
    }

    pub fn has_flagged(&self) -> bool {
        self.detail_stats.flagged() > 0 || self.summary_stats.flagged() > 0
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Fundline,
    Partner,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fundline => write!(f, "fundline"),
            Self::Partner => write!(f, "partner"),
        }
    }
}

/// Skip/error notes collected while a run proceeds.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    SourceRead {
        side: Side,
        file: String,
        message: String,
    },
    SchemaMismatch {
        side: Side,
        file: String,
        missing: Vec<String>,
    },
    ValueCoercion {
        side: Side,
        file: String,
        quality: DataQuality,
    },
    NoMatchFound {
        file: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        best_candidate: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        best_score: Option<f64>,
    },
    EmptyIntersection {
        fundline: String,
        partner: String,
    },
    ExecutorFailed {
        fundline: String,
        partner: String,
        message: String,
    },
    ReportWriteFailed {
        fundline: String,
        partner: String,
        message: String,
    },
    DuplicateFileName {
        side: Side,
        file: String,
    },
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead { side, file, message } => {
                write!(f, "{side} file '{file}' could not be read: {message}")
            }
            Self::SchemaMismatch { side, file, missing } => {
                write!(f, "{side} file '{file}': required columns not found: {}", missing.join(", "))
            }
            Self::ValueCoercion { side, file, quality } => write!(
                f,
                "{side} file '{file}': dropped {} unparseable period(s), {} unparseable and {} missing measure(s)",
                quality.period_unparseable, quality.measure_unparseable, quality.measure_missing
            ),
            Self::NoMatchFound { file, best_candidate, best_score } => match (best_candidate, best_score) {
                (Some(c), Some(s)) => write!(f, "no partner file for '{file}' (best '{c}' scored {s:.1})"),
                _ => write!(f, "no partner file for '{file}'"),
            },
            Self::EmptyIntersection { fundline, partner } => {
                write!(f, "'{fundline}' and '{partner}' share no ISIN/period combinations")
            }
            Self::ExecutorFailed { fundline, partner, message } => {
                write!(f, "comparison of '{fundline}' and '{partner}' failed: {message}")
            }
            Self::ReportWriteFailed { fundline, partner, message } => {
                write!(f, "no workbook for '{fundline}' and '{partner}': {message}")
            }
            Self::DuplicateFileName { side, file } => {
                write!(f, "{side} file name '{file}' given more than once; later copies skipped")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// One of the two sides had no files at all.
    NoFilesUploaded,
    /// Files were present but no Fundline file found a partner.
    NoMatches,
    /// Every file on at least one side lacked the required columns.
    RequiredColumnsNotFound,
    /// At least one pair was handed to the executor.
    Compared,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub fundline_files: usize,
    pub partner_files: usize,
    pub pairs: usize,
    pub comparisons: usize,
    pub empty_intersections: usize,
    pub flagged_detail_rows: usize,
    pub flagged_summary_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub outcome: RunOutcome,
    pub summary: RunSummary,
    pub pairs: Vec<MatchedPair>,
    pub comparisons: Vec<ComparisonResult>,
    pub annotations: Vec<Annotation>,
}

impl RunReport {
    pub fn has_flagged(&self) -> bool {
        self.comparisons.iter().any(|c| c.has_flagged())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}
