pub mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pestpro_core::config::{AppConfig, ConfigError, LoadOptions, LoggingConfig};

use crate::commands::presets::PresetAction;

#[derive(Debug, Parser)]
#[command(
    name = "pestpro",
    about = "PestPro operator CLI",
    long_about = "Import customers in bulk from a CSV export, manage the local session and job description presets, and inspect configuration.",
    after_help = "Examples:\n  pestpro import customers.csv --dry-run\n  pestpro login tech@example.com\n  pestpro presets add \"Wasp nest removal\"\n  pestpro doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Map a customer CSV export and submit it as one bulk upload")]
    Import {
        #[arg(help = "Path to the CSV file")]
        file: PathBuf,
        #[arg(long, help = "Parse and validate only; print the batch without submitting")]
        dry_run: bool,
    },
    #[command(about = "Sign in with an email address registered on the backend")]
    Login {
        #[arg(help = "Email address of an existing user")]
        email: String,
    },
    #[command(about = "Forget the stored session")]
    Logout,
    #[command(about = "Show the signed-in user")]
    Whoami,
    #[command(about = "List or edit job description presets")]
    Presets {
        #[command(subcommand)]
        action: PresetsCommand,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, local store access, and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum PresetsCommand {
    #[command(about = "Print the saved presets")]
    List,
    #[command(about = "Append a preset")]
    Add { label: String },
    #[command(about = "Delete a preset by label")]
    Remove { label: String },
}

impl From<PresetsCommand> for PresetAction {
    fn from(command: PresetsCommand) -> Self {
        match command {
            PresetsCommand::List => PresetAction::List,
            PresetsCommand::Add { label } => PresetAction::Add(label),
            PresetsCommand::Remove { label } => PresetAction::Remove(label),
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging_config = logging_config(AppConfig::load(LoadOptions::default()));
    if let Err(error) = logging::init(&logging_config) {
        eprintln!("pestpro: logging disabled: {error:#}");
    }

    let result = match cli.command {
        Command::Import { file, dry_run } => commands::import::run(&file, dry_run),
        Command::Login { email } => commands::session::login(&email),
        Command::Logout => commands::session::logout(),
        Command::Whoami => commands::session::whoami(),
        Command::Presets { action } => commands::presets::run(action.into()),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Config errors are reported by the command itself; logging still comes up
/// with defaults so the command's events are not lost.
fn logging_config(loaded: Result<AppConfig, ConfigError>) -> LoggingConfig {
    loaded.map(|config| config.logging).unwrap_or_else(|_| AppConfig::default().logging)
}

#[cfg(test)]
mod tests {
    use pestpro_core::config::{AppConfig, ConfigError, LogFormat};

    use super::logging_config;

    #[test]
    fn invalid_config_falls_back_to_default_logging() {
        let logging =
            logging_config(Err(ConfigError::Validation("api.timeout_secs".to_string())));

        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Compact);
    }

    #[test]
    fn loaded_config_keeps_its_logging_section() {
        let mut config = AppConfig::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Json;

        let logging = logging_config(Ok(config));

        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
    }
}
