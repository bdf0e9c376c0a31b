pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "answer",
    about = "Answer Engine operator CLI",
    long_about = "Inspect configuration, check readiness, apply migrations, and run engine turns offline.",
    after_help = "Examples:\n  answer doctor --json\n  answer config\n  answer turn --input turn.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Run end-to-end readiness checks with per-check timing details")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM provider settings, and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one decision-engine turn over a JSON input file and print the response")]
    Turn {
        #[arg(long, value_name = "FILE", help = "Path to an engine input JSON document")]
        input: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Turn { input } => commands::turn::run(&input),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
