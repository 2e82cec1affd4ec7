// provcheck - reconcile Fundline provision exports against partner statements

mod config_cmd;
mod exit_codes;
mod inspect;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use provcheck_config::ConfigError;

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_IO, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "provcheck")]
#[command(about = "Reconcile provision figures between Fundline and partner spreadsheets")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair files by name, compare provisions per ISIN and period, write workbooks
    #[command(after_help = "\
Examples:
  provcheck run --fundline fundline/*.xlsx --partner partner/*.xlsx
  provcheck run --fundline Q1_Report_ABC.xlsx --partner ABC_Report_Q1.xlsx --out results/
  provcheck run --fundline a.xlsx --partner b.xlsx --json > report.json
  provcheck run --fundline a.xlsx --partner b.xlsx --report report.json --mode injective")]
    Run {
        /// Fundline exports (expected values)
        #[arg(long, required = true, num_args = 1..)]
        fundline: Vec<PathBuf>,

        /// Partner statements (reported values)
        #[arg(long, required = true, num_args = 1..)]
        partner: Vec<PathBuf>,

        /// Directory for comparison workbooks
        #[arg(long, short = 'o', default_value = ".")]
        out: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Also write the run report as JSON to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,

        /// Skip writing comparison workbooks
        #[arg(long)]
        no_workbooks: bool,
    },

    /// Show which partner file each Fundline file would be paired with
    #[command(name = "match")]
    #[command(after_help = "\
Examples:
  provcheck match --fundline Q1_Report_ABC.xlsx --partner ABC_Report_Q1.xlsx XYZ_Unrelated.xlsx
  provcheck match --fundline fundline/*.xlsx --partner partner/*.xlsx --json")]
    Match {
        /// Fundline file names (files need not exist)
        #[arg(long, required = true, num_args = 1..)]
        fundline: Vec<PathBuf>,

        /// Partner file names (files need not exist)
        #[arg(long, required = true, num_args = 1..)]
        partner: Vec<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show how one workbook is read: detected header, mapped columns, dropped rows
    #[command(after_help = "\
Examples:
  provcheck inspect partner/ABC_Report_Q1.xlsx
  provcheck inspect fundline/Q1_Report_ABC.xlsx --side fundline --json")]
    Inspect {
        /// Workbook to inspect
        file: PathBuf,

        /// Which side's measure column to look for
        #[arg(long, value_enum, default_value = "partner")]
        side: SideArg,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

/// Config selection shared by every command that runs the engine.
#[derive(clap::Args)]
struct ConfigArgs {
    /// Config file (default: $PROVCHECK_CONFIG, then the per-user file)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override matching.threshold (0-100)
    #[arg(long)]
    threshold: Option<f64>,

    /// Override matching.mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Independent,
    Injective,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Fundline,
    Partner,
}

impl From<SideArg> for provcheck_recon::model::Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Fundline => Self::Fundline,
            SideArg::Partner => Self::Partner,
        }
    }
}

impl ConfigArgs {
    /// Discover, load and apply command-line overrides.
    fn resolve(&self) -> Result<provcheck_recon::ReconConfig, CliError> {
        use provcheck_recon::config::MatchMode;

        let (mut config, _source) = provcheck_config::load(self.config.as_deref()).map_err(CliError::config)?;
        if let Some(threshold) = self.threshold {
            config.matching.threshold = threshold;
        }
        if let Some(mode) = self.mode {
            config.matching.mode = match mode {
                ModeArg::Independent => MatchMode::Independent,
                ModeArg::Injective => MatchMode::Injective,
            };
        }
        config
            .validate()
            .map_err(|e| CliError::args(e.to_string()).with_hint("check --threshold"))?;
        Ok(config)
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  provcheck-recon ",
        env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { fundline, partner, out, config, json, report, no_workbooks } => {
            recon::cmd_run(fundline, partner, out, &config, json, report, no_workbooks)
        }
        Commands::Match { fundline, partner, config, json } => recon::cmd_match(fundline, partner, &config, json),
        Commands::Inspect { file, side, config, json } => inspect::cmd_inspect(file, side.into(), &config, json),
        Commands::Config(cmd) => config_cmd::cmd_config(cmd),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Map a config error to its exit code.
    pub fn config(err: ConfigError) -> Self {
        match &err {
            ConfigError::Read { .. } => Self { code: EXIT_INVALID_CONFIG, message: err.to_string(), hint: None }
                .with_hint("pass an existing file to --config, or unset PROVCHECK_CONFIG"),
            ConfigError::Invalid { .. } => Self { code: EXIT_INVALID_CONFIG, message: err.to_string(), hint: None }
                .with_hint("provcheck config validate <file> checks a config without running"),
            ConfigError::Exists(_) => Self::args(err.to_string()).with_hint("use --force to overwrite"),
            ConfigError::Write { .. } => Self::io(err.to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
