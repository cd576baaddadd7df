mod cli;
mod converter;
mod error;
mod exporter;
mod notebook;
mod paths;
mod resources;

use anyhow::{bail, Result};
use clap::Parser;
use std::io::IsTerminal;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let summary = converter::run(&cli);
    if summary.failed > 0 {
        bail!(
            "{} notebook(s) failed to convert ({} converted)",
            summary.failed,
            summary.converted
        );
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    // Dependencies stay quiet unless RUST_LOG asks for them
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,nb2html={level}")));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}
