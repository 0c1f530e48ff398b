pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "krishimitr",
    about = "KrishiMitr operator CLI",
    long_about = "Prepare the conversation store, inspect configuration, and run single queries \
                  through the same dispatcher the server uses.",
    after_help = "Examples:\n  krishimitr doctor --json\n  krishimitr ask \"pyaaz ka bhav kya hai\"\n  krishimitr recall \"sinchai\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, provider credentials, and cache store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Answer one message online and cache the reply when it is substantive")]
    Ask {
        #[arg(help = "Farmer message, in any script")]
        message: String,
    },
    #[command(about = "Answer one message from the offline cache only")]
    Recall {
        #[arg(help = "Text to look for inside previously cached questions")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Ask { message } => commands::ask::run(&message),
        Command::Recall { message } => commands::recall::run(&message),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
