pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "coverdesk",
    about = "Coverdesk operator CLI",
    long_about = "Operate coverdesk migrations, demo data, readiness checks, renewal scans, and exports.",
    after_help = "Examples:\n  coverdesk migrate\n  coverdesk doctor\n  coverdesk renewals\n  coverdesk export --output quotes.csv"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset into the configured database")]
    Seed,
    #[command(about = "Validate config and database connectivity checks")]
    Doctor,
    #[command(about = "Run one renewal scan pass over the policy book")]
    Renewals,
    #[command(about = "Export the quote list to CSV")]
    Export {
        #[arg(long, default_value = "quotes.csv", help = "Destination file for the CSV export")]
        output: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor => commands::doctor::run(),
        Command::Renewals => commands::renewals::run(),
        Command::Export { output } => commands::export::run(&output),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
