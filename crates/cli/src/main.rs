mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgstore_core::Backend;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "pkgstore",
    version,
    about = "Read and write package files in local or S3-backed storage"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;
    let working_dir = std::env::current_dir().context("failed to read working directory")?;
    let backend = Backend::from_config(&config.storage, &working_dir)?;

    match cli.command {
        commands::Command::Info => commands::info::run(&backend).await,
        commands::Command::Get(args) => commands::get::run(&backend, args).await,
        commands::Command::Put(args) => commands::put::run(&backend, args).await,
        commands::Command::Write(args) => commands::write::run(&backend, args).await,
        commands::Command::Rm(args) => commands::rm::run(&backend, args).await,
    }
}
