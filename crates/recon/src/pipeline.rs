//! End-to-end run over two sets of loaded workbooks.

use std::collections::HashSet;

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::evidence::compute_run_summary;
use crate::executor::{CompareJob, Executor};
use crate::facts::Normalizer;
use crate::matcher::match_files;
use crate::model::{
    Annotation, FactTable, RunMeta, RunOutcome, RunReport, Side, SourceWorkbook,
};

/// Workbooks for both sides plus notes from loading them (files that could
/// not be read still count as uploaded).
#[derive(Debug, Default)]
pub struct RunInput {
    pub fundline: Vec<SourceWorkbook>,
    pub partner: Vec<SourceWorkbook>,
    pub annotations: Vec<Annotation>,
}

impl RunInput {
    fn uploaded(&self, side: Side) -> usize {
        let unreadable = self
            .annotations
            .iter()
            .filter(|a| matches!(a, Annotation::SourceRead { side: s, .. } if *s == side))
            .count();
        let loaded = match side {
            Side::Fundline => self.fundline.len(),
            Side::Partner => self.partner.len(),
        };
        loaded + unreadable
    }
}

struct Normalized {
    name: String,
    facts: Option<FactTable>,
}

fn normalize_side(
    normalizer: &Normalizer<'_>,
    workbooks: &[SourceWorkbook],
    side: Side,
    annotations: &mut Vec<Annotation>,
) -> Vec<Normalized> {
    workbooks
        .iter()
        .map(|wb| {
            let facts = match normalizer.normalize(wb, side) {
                Ok(facts) => {
                    if facts.quality.coercion_drops() + facts.quality.measure_missing > 0 {
                        annotations.push(Annotation::ValueCoercion {
                            side,
                            file: wb.name.clone(),
                            quality: facts.quality.clone(),
                        });
                    }
                    Some(facts)
                }
                Err(ReconError::SchemaMismatch { file, missing }) => {
                    log::warn!("skipping {side} file '{file}': missing {}", missing.join(", "));
                    annotations.push(Annotation::SchemaMismatch { side, file, missing });
                    None
                }
                Err(e) => {
                    log::warn!("skipping {side} file '{}': {e}", wb.name);
                    annotations.push(Annotation::SourceRead {
                        side,
                        file: wb.name.clone(),
                        message: e.to_string(),
                    });
                    None
                }
            };
            Normalized { name: wb.name.clone(), facts }
        })
        .collect()
}

/// Pairs and output workbooks are keyed by file name, so only the first
/// workbook of each name on a side takes part.
fn dedupe_names(
    workbooks: Vec<SourceWorkbook>,
    side: Side,
    annotations: &mut Vec<Annotation>,
) -> Vec<SourceWorkbook> {
    let mut seen = HashSet::new();
    workbooks
        .into_iter()
        .filter(|wb| {
            if seen.insert(wb.name.clone()) {
                return true;
            }
            log::warn!("skipping {side} file '{}': name given more than once", wb.name);
            annotations.push(Annotation::DuplicateFileName {
                side,
                file: wb.name.clone(),
            });
            false
        })
        .collect()
}

fn find<'n>(side: &'n [Normalized], name: &str) -> Option<&'n FactTable> {
    side.iter().find(|n| n.name == name).and_then(|n| n.facts.as_ref())
}

/// Normalize, match and compare. Never fails once `config` is valid;
/// per-file and per-pair problems become annotations on the report.
pub fn run(config: &ReconConfig, input: RunInput, executor: &dyn Executor) -> RunReport {
    let fundline_files = input.uploaded(Side::Fundline);
    let partner_files = input.uploaded(Side::Partner);
    let mut annotations = input.annotations;
    let fundline_books = dedupe_names(input.fundline, Side::Fundline, &mut annotations);
    let partner_books = dedupe_names(input.partner, Side::Partner, &mut annotations);

    let normalizer = Normalizer::new(config);
    let fundline = normalize_side(&normalizer, &fundline_books, Side::Fundline, &mut annotations);
    let partner = normalize_side(&normalizer, &partner_books, Side::Partner, &mut annotations);

    let mut report = RunReport {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        outcome: RunOutcome::NoFilesUploaded,
        summary: compute_run_summary(fundline_files, partner_files, 0, &[]),
        pairs: Vec::new(),
        comparisons: Vec::new(),
        annotations: Vec::new(),
    };

    if fundline_files == 0 || partner_files == 0 {
        report.annotations = annotations;
        return report;
    }

    let fundline_names: Vec<String> = fundline.iter().map(|n| n.name.clone()).collect();
    let partner_names: Vec<String> = partner.iter().map(|n| n.name.clone()).collect();
    let matched = match_files(&fundline_names, &partner_names, &config.matching);

    for miss in &matched.unmatched {
        annotations.push(Annotation::NoMatchFound {
            file: miss.fundline.clone(),
            best_candidate: miss.best_candidate.clone(),
            best_score: miss.best_score,
        });
    }

    report.pairs = matched.pairs;
    report.summary = compute_run_summary(fundline_files, partner_files, report.pairs.len(), &[]);

    if report.pairs.is_empty() {
        report.outcome = RunOutcome::NoMatches;
        report.annotations = annotations;
        return report;
    }

    let all_failed = |side: &[Normalized]| side.iter().all(|n| n.facts.is_none());
    if all_failed(&fundline) || all_failed(&partner) {
        report.outcome = RunOutcome::RequiredColumnsNotFound;
        report.annotations = annotations;
        return report;
    }

    for pair in &report.pairs {
        let (Some(left), Some(right)) = (find(&fundline, &pair.fundline), find(&partner, &pair.partner)) else {
            log::warn!("skipping pair '{}' / '{}': a side failed normalization", pair.fundline, pair.partner);
            continue;
        };
        let job = CompareJob {
            fundline: left.clone(),
            partner: right.clone(),
            tolerance: config.tolerance,
        };
        match executor.compare(&job) {
            Ok(result) => {
                if result.is_empty_intersection() {
                    annotations.push(Annotation::EmptyIntersection {
                        fundline: pair.fundline.clone(),
                        partner: pair.partner.clone(),
                    });
                }
                report.comparisons.push(result);
            }
            Err(e) => {
                log::warn!("comparison of '{}' and '{}' failed: {e}", pair.fundline, pair.partner);
                annotations.push(Annotation::ExecutorFailed {
                    fundline: pair.fundline.clone(),
                    partner: pair.partner.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    report.outcome = RunOutcome::Compared;
    report.summary =
        compute_run_summary(fundline_files, partner_files, report.pairs.len(), &report.comparisons);
    report.annotations = annotations;
    report
}
