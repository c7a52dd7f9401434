pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "bookmatch",
    about = "Book recommendation and catalog matching CLI",
    long_about = "Ask for book recommendations, confirm each suggestion against the catalog, and inspect configuration.",
    after_help = "Examples:\n  bookmatch recommend --question \"프로그래밍 입문서 추천해주세요\" --owned owned.json\n  bookmatch owned --owned owned.json\n  bookmatch doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (default: bookmatch.toml)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend books for a question and print the matched catalog records")]
    Recommend {
        #[arg(long, help = "Natural-language request")]
        question: String,
        #[arg(long, value_name = "FILE", help = "JSON array of owned books {id,title,author}")]
        owned: Option<PathBuf>,
    },
    #[command(about = "Recommend new books from an owned-book list alone")]
    Owned {
        #[arg(long, value_name = "FILE", help = "JSON array of owned books {id,title,author}")]
        owned: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match &cli.command {
        Command::Recommend { question, owned } => {
            commands::recommend::run(config_path, question, owned.as_deref())
        }
        Command::Owned { owned } => commands::owned::run(config_path, owned),
        Command::Config => commands::config::run(config_path),
        Command::Doctor { json } => commands::doctor::run(config_path, *json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
