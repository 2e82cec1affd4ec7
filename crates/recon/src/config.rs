use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Side, ToleranceFlag};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// chrono formats tried in order when a period cell holds text.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub synonyms: SynonymTable,
    #[serde(default)]
    pub period_parts: PeriodParts,
    #[serde(default)]
    pub sides: SidesConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            date_formats: default_date_formats(),
            synonyms: SynonymTable::default(),
            period_parts: PeriodParts::default(),
            sides: SidesConfig::default(),
            matching: MatchingConfig::default(),
            tolerance: ToleranceConfig::default(),
        }
    }
}

fn default_name() -> String {
    "Provision reconciliation".into()
}

fn default_date_formats() -> Vec<String> {
    ["%d.%m.%Y", "%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Canonical vocabulary + synonyms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Identifier,
    Period,
    Measure,
}

impl CanonicalField {
    /// Mapping order. Identifier and period come first so a measure alias
    /// can never shadow a key column.
    pub const ALL: [CanonicalField; 3] = [Self::Identifier, Self::Period, Self::Measure];

    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Period => "period",
            Self::Measure => "measure",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// Canonical field -> source header strings, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynonymTable {
    #[serde(default = "default_identifier_aliases")]
    pub identifier: Vec<String>,
    #[serde(default = "default_measure_aliases")]
    pub measure: Vec<String>,
    #[serde(default = "default_period_aliases")]
    pub period: Vec<String>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self {
            identifier: default_identifier_aliases(),
            measure: default_measure_aliases(),
            period: default_period_aliases(),
        }
    }
}

impl SynonymTable {
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Identifier => &self.identifier,
            CanonicalField::Period => &self.period,
            CanonicalField::Measure => &self.measure,
        }
    }

    /// Every alias of every field, in mapping order.
    pub fn all_aliases(&self) -> impl Iterator<Item = &str> {
        CanonicalField::ALL
            .into_iter()
            .flat_map(move |f| self.aliases(f).iter().map(|s| s.as_str()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.all_aliases().any(|a| a == label)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_identifier_aliases() -> Vec<String> {
    strings(&["ISIN", "Isin", "Isin Code", "Share ISIN Reference", "FINANZINSTRUMENT_IDENT", "Text23"])
}

fn default_measure_aliases() -> Vec<String> {
    strings(&[
        "Comm. Amount",
        "Provision",
        "Betrag (€)",
        "Vergütung",
        "EURMonat",
        "Client Trailer Fees Amount In Consolidated Currency",
        "Amount In Agreement Ccy",
        "Bepro",
        "Provisionsbetrag in Währung",
        "Fee",
        "BPROV",
        "BpkEUR",
        "Kommissionsbetrag",
        "Commission Due Payment CCY",
        "Fee (Payment Currency)",
        "Amount In Partner Currency",
        "Betrag (EUR)",
    ])
}

fn default_period_aliases() -> Vec<String> {
    strings(&[
        "Date",
        "Datum",
        "Booking Date",
        "End-Datum",
        "Period End Date",
        "Holding as of",
        "STICHTAG",
        "Period",
        "Datum_str",
        "Positionsdatum",
        "Stichtag",
        "Retrocession Date",
    ])
}

// ---------------------------------------------------------------------------
// Period parts (month + year split across two columns)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodParts {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_month_label")]
    pub month: String,
    #[serde(default = "default_year_label")]
    pub year: String,
    /// Header label of the synthesized date column.
    #[serde(default = "default_period_label")]
    pub label: String,
}

impl Default for PeriodParts {
    fn default() -> Self {
        Self {
            enabled: true,
            month: default_month_label(),
            year: default_year_label(),
            label: default_period_label(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_month_label() -> String {
    "Statement Month".into()
}

fn default_year_label() -> String {
    "Statement Year".into()
}

fn default_period_label() -> String {
    "Date".into()
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidesConfig {
    #[serde(default = "default_fundline_side")]
    pub fundline: SideConfig,
    #[serde(default)]
    pub partner: SideConfig,
}

impl Default for SidesConfig {
    fn default() -> Self {
        Self {
            fundline: default_fundline_side(),
            partner: SideConfig::default(),
        }
    }
}

impl SidesConfig {
    pub fn get(&self, side: Side) -> &SideConfig {
        match side {
            Side::Fundline => &self.fundline,
            Side::Partner => &self.partner,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SideConfig {
    /// Source column holding this side's measure. Defaults to canonical `measure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_column: Option<String>,
}

impl SideConfig {
    pub fn measure_column(&self) -> &str {
        self.measure_column
            .as_deref()
            .unwrap_or(CanonicalField::Measure.column_name())
    }
}

fn default_fundline_side() -> SideConfig {
    SideConfig {
        measure_column: Some("Erwartete Prov. Whg".into()),
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Best score must be strictly above this (0-100 scale).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub mode: MatchMode,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            mode: MatchMode::default(),
        }
    }
}

fn default_threshold() -> f64 {
    80.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Each Fundline file picks its best partner; partners may be reused.
    #[default]
    Independent,
    /// Greedy one-to-one: a chosen partner leaves the candidate pool.
    Injective,
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceBand {
    #[serde(default = "default_lower")]
    pub lower: f64,
    #[serde(default = "default_upper")]
    pub upper: f64,
}

impl Default for ToleranceBand {
    fn default() -> Self {
        Self {
            lower: default_lower(),
            upper: default_upper(),
        }
    }
}

fn default_lower() -> f64 {
    -20.0
}

fn default_upper() -> f64 {
    20.0
}

impl ToleranceBand {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Strict comparisons: a difference equal to either bound is within.
    pub fn classify(&self, difference: f64) -> ToleranceFlag {
        if difference < self.lower {
            ToleranceFlag::BelowThreshold
        } else if difference > self.upper {
            ToleranceFlag::AboveThreshold
        } else {
            ToleranceFlag::WithinTolerance
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    #[serde(default)]
    pub detail: ToleranceBand,
    #[serde(default)]
    pub summary: ToleranceBand,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.date_formats.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one date format is required".into(),
            ));
        }

        // Every canonical field needs at least one alias
        for field in CanonicalField::ALL {
            if self.synonyms.aliases(field).is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "synonyms.{field} must list at least one header"
                )));
            }
        }

        // An alias may only map to one canonical field
        let mut owner: HashMap<&str, CanonicalField> = HashMap::new();
        for field in CanonicalField::ALL {
            for alias in self.synonyms.aliases(field) {
                if let Some(prev) = owner.insert(alias.as_str(), field) {
                    if prev != field {
                        return Err(ReconError::ConfigValidation(format!(
                            "header '{alias}' is listed under both synonyms.{prev} and synonyms.{field}"
                        )));
                    }
                }
            }
        }

        if !(0.0..=100.0).contains(&self.matching.threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.threshold must be between 0 and 100, got {}",
                self.matching.threshold
            )));
        }

        for (name, band) in [("detail", &self.tolerance.detail), ("summary", &self.tolerance.summary)] {
            if !band.lower.is_finite() || !band.upper.is_finite() {
                return Err(ReconError::ConfigValidation(format!(
                    "tolerance.{name}: lower and upper must be finite numbers"
                )));
            }
            if band.lower > band.upper {
                return Err(ReconError::ConfigValidation(format!(
                    "tolerance.{name}: lower ({}) must not exceed upper ({})",
                    band.lower, band.upper
                )));
            }
        }

        if self.period_parts.enabled && self.period_parts.month == self.period_parts.year {
            return Err(ReconError::ConfigValidation(
                "period_parts.month and period_parts.year must differ".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
