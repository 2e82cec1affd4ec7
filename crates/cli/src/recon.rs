//! `provcheck run` and `provcheck match`.

use std::path::PathBuf;

use provcheck_io::xlsx::{file_name, load_sources};
use provcheck_recon::matcher::match_files;
use provcheck_recon::model::{Annotation, RunOutcome, RunReport, Side};
use provcheck_recon::{run, LocalExecutor, RunInput};

use crate::exit_codes::{EXIT_FLAGGED, EXIT_IO, EXIT_NOTHING_COMPARED, EXIT_SUCCESS};
use crate::{CliError, ConfigArgs};

pub fn cmd_run(
    fundline: Vec<PathBuf>,
    partner: Vec<PathBuf>,
    out: PathBuf,
    config_args: &ConfigArgs,
    json_output: bool,
    report_file: Option<PathBuf>,
    no_workbooks: bool,
) -> Result<u8, CliError> {
    let config = config_args.resolve()?;
    log::debug!("{} fundline and {} partner paths", fundline.len(), partner.len());

    let (fundline_books, mut annotations) = load_sources(&fundline, Side::Fundline);
    let (partner_books, partner_notes) = load_sources(&partner, Side::Partner);
    annotations.extend(partner_notes);

    let input = RunInput {
        fundline: fundline_books,
        partner: partner_books,
        annotations,
    };
    let mut report = run(&config, input, &LocalExecutor);

    let written = if no_workbooks {
        Vec::new()
    } else {
        let (written, notes) = provcheck_io::write_reports(&report.comparisons, &config.tolerance, &out)
            .map_err(|e| CliError::io(e.to_string()))?;
        report.annotations.extend(notes);
        written
    };

    if let Some(ref path) = report_file {
        provcheck_io::json::export_report(&report, path).map_err(|e| CliError::io(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&report, config.matching.threshold, &written);
    if report.annotations.iter().any(|a| matches!(a, Annotation::ReportWriteFailed { .. })) {
        return Ok(EXIT_IO);
    }
    Ok(exit_code(&report))
}

/// Human summary to stderr.
fn print_summary(report: &RunReport, threshold: f64, written: &[PathBuf]) {
    for note in &report.annotations {
        eprintln!("note: {note}");
    }

    let s = &report.summary;
    match report.outcome {
        RunOutcome::NoFilesUploaded => eprintln!("no files on one side; nothing to compare"),
        RunOutcome::NoMatches => eprintln!(
            "{} fundline / {} partner files, no pair scored above {}",
            s.fundline_files, s.partner_files, threshold
        ),
        RunOutcome::RequiredColumnsNotFound => {
            eprintln!("required columns not found in every file of one side")
        }
        RunOutcome::Compared => {
            eprintln!(
                "{} pairs, {} compared ({} with no shared ISIN/period), {} detail and {} summary rows out of tolerance",
                s.pairs, s.comparisons, s.empty_intersections, s.flagged_detail_rows, s.flagged_summary_rows,
            );
        }
    }

    for path in written {
        eprintln!("wrote {}", path.display());
    }
}

fn exit_code(report: &RunReport) -> u8 {
    let compared_with_data = report.comparisons.iter().any(|c| !c.is_empty_intersection());
    if report.outcome != RunOutcome::Compared || !compared_with_data {
        EXIT_NOTHING_COMPARED
    } else if report.has_flagged() {
        EXIT_FLAGGED
    } else {
        EXIT_SUCCESS
    }
}

pub fn cmd_match(
    fundline: Vec<PathBuf>,
    partner: Vec<PathBuf>,
    config_args: &ConfigArgs,
    json_output: bool,
) -> Result<u8, CliError> {
    let config = config_args.resolve()?;
    let fundline: Vec<String> = fundline.iter().map(|p| file_name(p)).collect();
    let partner: Vec<String> = partner.iter().map(|p| file_name(p)).collect();

    let output = match_files(&fundline, &partner, &config.matching);

    if json_output {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        for pair in &output.pairs {
            println!("{}\t{}\t{:.1}", pair.fundline, pair.partner, pair.score);
        }
        for miss in &output.unmatched {
            let note = Annotation::NoMatchFound {
                file: miss.fundline.clone(),
                best_candidate: miss.best_candidate.clone(),
                best_score: miss.best_score,
            };
            eprintln!("note: {note}");
        }
    }

    Ok(if output.pairs.is_empty() { EXIT_NOTHING_COMPARED } else { EXIT_SUCCESS })
}
