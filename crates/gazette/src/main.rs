//! Gazette CLI - template-driven static site generator.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "gazette")]
#[command(about = "Template-driven static site generator with blog pagination")]
#[command(version)]
pub struct Cli {
    /// Build mode; reads config_<MODE>.toml instead of config.toml
    mode: Option<String>,

    /// Output directory (defaults to config or "html")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    commands::build::run(cli.mode.as_deref(), cli.output)
}
