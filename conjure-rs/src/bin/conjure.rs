//! CLI for conjure-rs: validate configuration files and list their containers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use conjure_rs::{Assembler, Locator, SymbolTable};

#[derive(Parser)]
#[command(name = "conjure")]
#[command(about = "Conjure container configuration tool")]
struct Cli {
    /// Log binder and registry decisions at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load configuration files, build the registry and list its containers.
    Check {
        /// JSON configuration files, merged in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print the merged container metadata as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CONJURE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_check(files: &[PathBuf], json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut assembler = Assembler::new();
    assembler.load(files)?;
    // Activation is lazy: building checks ids and interception wiring, nothing is loaded.
    let registry = assembler.build(Arc::new(SymbolTable::new()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(assembler.containers())?);
        return Ok(());
    }

    println!("{:<24} {:<14} {:<32} {:<9} {}", "ID", "KIND", "TARGET", "CACHED", "INTERCEPTED BY");
    for meta in assembler.containers() {
        println!(
            "{:<24} {:<14} {:<32} {:<9} {}",
            meta.id,
            meta.kind.label(),
            meta.kind.target(),
            meta.cacheable,
            registry.get_interceptions(&meta.id).len()
        );
    }
    println!("{} containers OK", assembler.containers().len());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Check { files, json } => run_check(&files, json),
    }
}
