pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gardenquote_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "gardenquote",
    about = "Gardenquote landscaping estimate CLI",
    long_about = "Chat through the garden intake or compute a deterministic estimate from recorded answers.",
    after_help = "Examples:\n  gardenquote chat\n  gardenquote estimate --answers answers.json --json\n  gardenquote prices\n  gardenquote config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Explicit config file instead of gardenquote.toml")]
    config_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run an interactive customer conversation on stdin/stdout")]
    Chat,
    #[command(about = "Compute a one-shot estimate from a JSON answer record")]
    Estimate {
        #[arg(long, help = "Path to the answer record JSON file")]
        answers: PathBuf,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the effective price table")]
    Prices {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_file.clone(),
            require_file: self.config_file.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let options = cli.load_options();
    let config_path = cli.config_file.as_deref();

    let result = match cli.command {
        Command::Chat => commands::chat::run(options),
        Command::Estimate { answers, json } => commands::estimate::run(&answers, json, options),
        Command::Prices { json } => commands::prices::run(json, options),
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(options, config_path),
        },
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
