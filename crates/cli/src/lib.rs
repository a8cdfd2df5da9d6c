pub mod commands;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use scopewise_core::config::{AppConfig, LoadOptions, LogFormat};
use scopewise_core::pricing::currency::Currency;

use crate::commands::selection::SelectionArgs;
use crate::commands::{CommandResult, EXIT_INVALID_INPUT};

#[derive(Debug, Parser)]
#[command(
    name = "scopewise",
    about = "Scopewise project estimator CLI",
    long_about = "Price a project scope, fit it to a budget, inspect advisor replies, and chat with the advisor.",
    after_help = "Examples:\n  scopewise quote --design-tier 2 --standard-pages 5\n  scopewise fit --budget 700000\n  scopewise parse --file reply.txt\n  scopewise chat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a selection and split it into payment milestones")]
    Quote {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, default_value = "ngn", help = "Display currency: ngn or usd")]
        currency: Currency,
    },
    #[command(about = "Reduce a selection until it fits a budget")]
    Fit {
        #[arg(long, help = "Budget amount, in --currency")]
        budget: Decimal,
        #[arg(long, default_value = "ngn", help = "Currency of the budget and output")]
        currency: Currency,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    #[command(about = "Parse a raw advisor reply (file or stdin) into its directives")]
    Parse {
        #[arg(long, help = "Read the reply from a file instead of stdin")]
        file: Option<PathBuf>,
    },
    #[command(about = "Render the advisor system instructions from the active pricing table")]
    Prompt {
        #[arg(long, help = "Print the instructions as plain text")]
        raw: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Chat with the advisor against the configured model")]
    Chat,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Quote { selection, currency } => commands::quote::run(&selection, currency),
        Command::Fit { budget, currency, selection } => {
            commands::fit::run(&selection, budget, currency)
        }
        Command::Parse { file } => match read_reply(file) {
            Ok(raw) => commands::parse::run(&raw),
            Err(error) => {
                CommandResult::failure("parse", "io", error.to_string(), EXIT_INVALID_INPUT)
            }
        },
        Command::Prompt { raw } => commands::prompt::run(raw),
        Command::Config => CommandResult { exit_code: 0, output: commands::config::run() },
        Command::Chat => commands::chat::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn read_reply(file: Option<PathBuf>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
/// Config errors are reported by the command itself.
fn init_logging() {
    use tracing::Level;

    let Ok(config) = AppConfig::load(LoadOptions::default()) else {
        return;
    };
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
