mod cmd_migrate;
mod cmd_resolve;
mod cmd_show;
mod cmd_validate;
mod host;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fba")]
#[command(about = "Validate, migrate, and resolve fishbone analysis documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug-level diagnostics on stderr
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that a document decodes at the current schema version
    Validate {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Rewrite a document at the current schema version
    Migrate {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to rewriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load the documents named by import placeholders and embed them
    Resolve {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to rewriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a document's structure
    Show {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { input } => cmd_validate::run(input),
        Commands::Migrate { input, output } => cmd_migrate::run(input, output),
        Commands::Resolve { input, output } => cmd_resolve::run(input, output).await,
        Commands::Show { input, json } => cmd_show::run(input, json),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
