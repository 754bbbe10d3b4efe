use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "coin-select",
    version,
    about = "Random-Improve coin selection over JSON wallet snapshots"
)]
pub struct Cli {
    /// Optional settings file (TOML, JSON or YAML), layered under `COIN_SELECT__*` variables.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select inputs for a request and print the selection as JSON
    Select(SelectArgs),
    /// Check a previously produced selection against its request
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Request file with the available UTxO and the outputs to pay
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,

    /// Seed for the selection RNG. Fresh OS entropy when omitted.
    #[arg(long, env = "COIN_SELECT_SEED")]
    pub seed: Option<u64>,

    /// Write the result here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Request file the selection was made for
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,

    /// Selection result produced by `select`
    #[arg(long, value_name = "FILE")]
    pub result: PathBuf,
}
