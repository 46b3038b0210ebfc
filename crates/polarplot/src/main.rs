use anyhow::Result;
use clap::{Parser, Subcommand};
use polarplot::cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Draw(args) => args.run(),
        Command::Setup(args) => args.run(),
    }
}

#[derive(Parser)]
#[command(name = "polarplot", about = "Drawing tools for polargraph plotters")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a pattern and stream its steps to an output.
    Draw(cli::draw::DrawArgs),
    /// Record the anchor separation and current cable lengths.
    Setup(cli::setup::SetupArgs),
}
