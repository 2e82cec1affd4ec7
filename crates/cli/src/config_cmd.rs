//! `provcheck config` subcommands.

use std::path::PathBuf;

use clap::Subcommand;
use provcheck_config::{settings, ConfigSource};

use crate::exit_codes::EXIT_SUCCESS;
use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default configuration file
    #[command(after_help = "\
Examples:
  provcheck config init
  provcheck config init --path ./provcheck.toml --force")]
    Init {
        /// Target file (default: the per-user config path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the active configuration and where it came from
    Show {
        /// Config file (default: $PROVCHECK_CONFIG, then the per-user file)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  provcheck config validate provcheck.toml")]
    Validate {
        file: PathBuf,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<u8, CliError> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            let path = path.unwrap_or_else(settings::config_path);
            settings::write_default(&path, force).map_err(CliError::config)?;
            eprintln!("wrote {}", path.display());
        }
        ConfigCommands::Show { config } => {
            let (config, source) = provcheck_config::load(config.as_deref()).map_err(CliError::config)?;
            let body = config.to_toml().map_err(|e| CliError::io(e.to_string()))?;
            println!("# source: {source}");
            print!("{body}");
        }
        ConfigCommands::Validate { file } => {
            let config = provcheck_config::load_from(&ConfigSource::Explicit(file.clone()))
                .map_err(CliError::config)?;
            eprintln!("{}: ok ({})", file.display(), config.name);
        }
    }
    Ok(EXIT_SUCCESS)
}
