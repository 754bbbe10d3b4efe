#![warn(clippy::all, clippy::pedantic)]

pub mod cli;
pub mod request;
pub mod settings;

use std::fs;

use anyhow::{Context, Result, anyhow, bail};
use coin_selection::{InputSelector, RandomImprove};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::cli::{CheckArgs, Cli, Command, SelectArgs};
use crate::request::{SelectionRequest, read_result};
use crate::settings::Settings;

/// # Errors
/// Returns an error if settings or input files are invalid, if selection
/// fails, or if a checked selection violates a guarantee.
pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Select(args) => run_select(&settings, &args),
        Command::Check(args) => run_check(&settings, &args),
    }
}

fn run_select(settings: &Settings, args: &SelectArgs) -> Result<()> {
    let request = SelectionRequest::from_path(&args.request)?;
    let utxo = request.utxo_set()?;
    let constraints = request.constraints(&settings.protocol_parameters);
    let selector = RandomImprove::new(settings.policy)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    info!(
        utxo = utxo.len(),
        outputs = request.outputs.len(),
        seeded = args.seed.is_some(),
        "selecting inputs"
    );

    let result = selector
        .select(&utxo, &request.outputs, &constraints, &mut rng)
        .map_err(|err| anyhow!("{}: {err}", err.kind()))?;

    info!(
        inputs = result.selection.inputs.len(),
        change_outputs = result.selection.change.len(),
        fee = result.selection.fee,
        fee_iterations = result.fee_iterations,
        "selection complete"
    );

    let json = serde_json::to_string_pretty(&result)?;
    match &args.out {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

fn run_check(settings: &Settings, args: &CheckArgs) -> Result<()> {
    let request = SelectionRequest::from_path(&args.request)?;
    let utxo = request.utxo_set()?;
    let constraints = request.constraints(&settings.protocol_parameters);
    let result = read_result(&args.result)?;

    if let Err(violation) = result.verify(&utxo, &request.outputs, &constraints) {
        bail!("selection check failed: {violation}");
    }

    println!(
        "ok: {} inputs, {} change outputs, fee {}",
        result.selection.inputs.len(),
        result.selection.change.len(),
        result.selection.fee
    );

    Ok(())
}
