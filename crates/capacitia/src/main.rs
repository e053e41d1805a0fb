use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::inspect::InspectArgs;
use commands::run::RunArgs;
use commands::show::ShowArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "CapacitIA training-records pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize the configured exports and write the derived tables
    Run(RunArgs),
    /// Detect encoding, delimiter and header of one export
    Inspect(InspectArgs),
    /// Print a materialized table
    Show(ShowArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => commands::run::handle(args),
        Command::Inspect(args) => commands::inspect::handle(args),
        Command::Show(args) => commands::show::handle(args),
    }
}
