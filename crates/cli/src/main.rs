#![warn(clippy::all, clippy::pedantic)]

use clap::Parser;
use coin_select_cli::cli::Cli;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging_init();

    coin_select_cli::run(Cli::parse())
}

fn logging_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the JSON result only.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
