//! eqscope CLI - inspect the equalizer core without a host.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eqscope")]
#[command(author, version, about = "Three-band EQ with spectrum analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the combined response curve of the filter chain
    Response(commands::response::ResponseArgs),

    /// Run a test tone through the chain and print the spectrum path
    Analyze(commands::analyze::AnalyzeArgs),

    /// Run the engine with its analysis thread and stream events
    Monitor(commands::monitor::MonitorArgs),

    /// List parameters with their ranges and defaults
    Params(commands::params::ParamsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eqscope=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Response(args) => commands::response::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Monitor(args) => commands::monitor::run(args),
        Commands::Params(args) => commands::params::run(args),
    }
}
