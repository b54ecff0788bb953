pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "carlot",
    about = "Carlot vehicle search assistant",
    long_about = "Run the conversational vehicle search assistant and its operator commands: migrations, inventory seeding, config inspection, and readiness checks.",
    after_help = "Examples:\n  carlot chat\n  carlot seed --count 1000\n  carlot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start the interactive vehicle search conversation")]
    Chat,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Populate an empty inventory with the showroom dataset")]
    Seed {
        #[arg(long, help = "Total vehicles to seed; the fixed showroom set plus generated ones")]
        count: Option<usize>,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config, database connectivity, and LLM endpoint readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Chat => commands::chat::run(),
        Command::Migrate => finish(commands::migrate::run()),
        Command::Seed { count } => finish(commands::seed::run(count)),
        Command::Config => {
            println!("{}", commands::config::run());
            ExitCode::SUCCESS
        }
        Command::Doctor { json } => {
            println!("{}", commands::doctor::run(json));
            ExitCode::SUCCESS
        }
    }
}

fn finish(result: commands::CommandResult) -> ExitCode {
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
