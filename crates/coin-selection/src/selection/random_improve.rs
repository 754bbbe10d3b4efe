//! The per-target rounds of Random-Improve.
//!
//! Every asset named by an output and the coin are *targets*. For each target,
//! in [`SelectionTarget`] order, a random round draws eligible UTxOs until the
//! total reaches `requirement * ideal_multiplier`, the eligible UTxOs run out
//! or the input limit is hit. Only ending below the requirement is an error.
//! An improve round then runs once per output paying the target, swapping
//! picks to move the total towards the ideal. A final coin top-up covers the
//! fee budget and the minimum coin of asset change.
//!
//! All rounds share one [`SelectionState`], so a UTxO picked for one target
//! already counts towards every other target it holds.

use crate::error::SelectionError;
use crate::schema::constraints::{SelectionConstraints, SelectionSkeleton};
use crate::schema::utxo::{TxIn, TxOut, Utxo, UtxoSet};
use crate::schema::value::{AssetId, Value};
use crate::selection::change::{asset_bundles, fund_bundles, total_coins};
use crate::selection::policy::SelectionPolicy;

use std::fmt;

use rand::{Rng, RngCore};
use tracing::{debug, trace};

/// Assets sort before the coin, so coin selection runs last and sees every
/// UTxO the asset rounds already picked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum SelectionTarget {
    Asset(AssetId),
    Coin,
}

impl SelectionTarget {
    pub fn quantity(&self, value: &Value) -> u64 {
        match self {
            Self::Asset(asset_id) => value.asset(asset_id),
            Self::Coin => value.coins(),
        }
    }
}

impl fmt::Display for SelectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(asset_id) => write!(f, "asset {asset_id}"),
            Self::Coin => f.write_str("coin"),
        }
    }
}

/// Assets requested by any output, ascending.
pub(crate) fn asset_targets(requested: &Value) -> Vec<SelectionTarget> {
    requested
        .asset_ids()
        .cloned()
        .map(SelectionTarget::Asset)
        .collect()
}

/// Selected and remaining UTxOs of one selection run.
#[derive(Debug, Clone)]
pub(crate) struct SelectionState {
    /// Picks, in the order they were drawn.
    selected: Vec<Utxo>,
    /// Unpicked UTxOs, kept sorted by input.
    remaining: Vec<Utxo>,
    limit: usize,
}

impl SelectionState {
    pub fn new(available: &UtxoSet, limit: usize) -> Self {
        Self {
            selected: Vec::new(),
            remaining: available.to_vec(),
            limit,
        }
    }

    pub fn selected(&self) -> &[Utxo] {
        &self.selected
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    pub fn selected_quantity(&self, target: &SelectionTarget) -> u64 {
        self.selected
            .iter()
            .fold(0u64, |sum, utxo| sum.saturating_add(target.quantity(utxo.value())))
    }

    pub fn selected_value(&self) -> Result<Value, SelectionError> {
        Value::coalesce(self.selected.iter().map(Utxo::value))
    }

    pub fn selected_set(&self) -> UtxoSet {
        self.selected.iter().cloned().collect()
    }

    /// Indices into `remaining` of UTxOs holding some of `target`.
    fn eligible(&self, target: &SelectionTarget) -> Vec<usize> {
        self.remaining
            .iter()
            .enumerate()
            .filter(|(_, utxo)| target.quantity(utxo.value()) > 0)
            .map(|(index, _)| index)
            .collect()
    }

    fn at_limit(&self) -> bool {
        self.selected.len() >= self.limit
    }

    fn take(&mut self, remaining_index: usize) -> TxIn {
        let utxo = self.remaining.remove(remaining_index);
        let input = utxo.input;
        self.selected.push(utxo);
        input
    }

    fn put_back(&mut self, input: &TxIn) {
        if let Some(position) = self.selected.iter().position(|utxo| utxo.input == *input) {
            let utxo = self.selected.remove(position);
            let slot = self
                .remaining
                .binary_search_by(|probe| probe.input.cmp(&utxo.input))
                .unwrap_or_else(|slot| slot);
            self.remaining.insert(slot, utxo);
        }
    }
}

fn draw(candidates: &[usize], rng: &mut dyn RngCore) -> usize {
    candidates[rng.random_range(0..candidates.len())]
}

/// Total `target` quantity held by `utxo`, saturating at `u64::MAX`.
///
/// Only requested targets are ever summed, so unrelated assets cannot
/// overflow the check.
pub(crate) fn available_quantity(utxo: &UtxoSet, target: &SelectionTarget) -> u64 {
    utxo.iter().fold(0u64, |sum, (_, output)| {
        sum.saturating_add(target.quantity(&output.value))
    })
}

/// Fail early when the whole UTxO set cannot pay for the outputs.
///
/// Coins are checked before assets.
pub(crate) fn check_balance(
    utxo: &UtxoSet,
    requested: &Value,
    fee_estimate: u64,
) -> Result<(), SelectionError> {
    let required = requested.coins().saturating_add(fee_estimate);
    let available = available_quantity(utxo, &SelectionTarget::Coin);
    if available < required {
        return Err(SelectionError::UtxoBalanceInsufficient {
            required,
            available,
        });
    }

    for (asset_id, requested_quantity) in requested.assets() {
        let available = available_quantity(utxo, &SelectionTarget::Asset(asset_id.clone()));
        if available < *requested_quantity {
            return Err(SelectionError::InputValueInsufficient {
                asset: asset_id.clone(),
                requested: *requested_quantity,
                available,
            });
        }
    }

    Ok(())
}

/// Draw eligible UTxOs at random until the total reaches the ideal
/// `requirement * ideal_multiplier`.
///
/// Running out of eligible UTxOs or reaching the input limit ends the round
/// early; that is only an error while the total is below `requirement`.
/// Returns the inputs picked by this round, in draw order.
pub(crate) fn random_round(
    state: &mut SelectionState,
    target: &SelectionTarget,
    requirement: u64,
    policy: &SelectionPolicy,
    rng: &mut dyn RngCore,
) -> Result<Vec<TxIn>, SelectionError> {
    let ideal = requirement.saturating_mul(policy.ideal_multiplier);
    let mut picks = Vec::new();

    loop {
        let total = state.selected_quantity(target);
        if total >= ideal {
            break;
        }

        let eligible = state.eligible(target);
        if eligible.is_empty() {
            if total < requirement {
                return Err(SelectionError::UtxoFullyDepleted {
                    target: target.to_string(),
                    missing: requirement - total,
                });
            }
            break;
        }
        if state.at_limit() {
            if total < requirement {
                return Err(SelectionError::MaximumInputCountExceeded {
                    limit: state.limit(),
                });
            }
            break;
        }

        let input = state.take(draw(&eligible, rng));
        trace!(%target, %input, "random round pick");
        picks.push(input);
    }

    debug!(
        %target,
        requirement,
        ideal,
        picks = picks.len(),
        total = state.selected_quantity(target),
        "random round done"
    );

    Ok(picks)
}

/// Move the target total closer to `requirement * ideal_multiplier`.
///
/// Runs `policy.improve_attempts` attempts for each of `outputs` (at least
/// one pass). Each attempt draws one candidate and either adds it or swaps it
/// for the smallest of `picks`. No move takes the total below `requirement`
/// or above `requirement * upper_multiplier`.
pub(crate) fn improve_round(
    state: &mut SelectionState,
    target: &SelectionTarget,
    requirement: u64,
    outputs: usize,
    picks: &mut Vec<TxIn>,
    policy: &SelectionPolicy,
    rng: &mut dyn RngCore,
) {
    if requirement == 0 {
        return;
    }

    let ideal = requirement.saturating_mul(policy.ideal_multiplier);
    let upper = requirement.saturating_mul(policy.upper_multiplier);
    let attempts = policy.improve_attempts.saturating_mul(outputs.max(1));

    for _ in 0..attempts {
        let eligible = state.eligible(target);
        if eligible.is_empty() {
            break;
        }

        let candidate_index = draw(&eligible, rng);
        let candidate_quantity = target.quantity(state.remaining[candidate_index].value());
        let total = state.selected_quantity(target);
        let distance = total.abs_diff(ideal);

        let added = total.saturating_add(candidate_quantity);
        let add_distance = (!state.at_limit() && added <= upper)
            .then(|| added.abs_diff(ideal))
            .filter(|add_distance| *add_distance < distance);

        let worst = worst_pick(state, target, picks);
        let swap = worst.and_then(|(worst_input, worst_quantity)| {
            let swapped = total - worst_quantity + candidate_quantity;
            if swapped < requirement || swapped > upper {
                return None;
            }
            let swap_distance = swapped.abs_diff(ideal);
            let improves = swap_distance < distance
                || (swap_distance == distance && candidate_quantity > worst_quantity);
            improves.then_some((worst_input, swap_distance))
        });

        let prefer_add = match (add_distance, &swap) {
            (Some(add_distance), Some((_, swap_distance))) => add_distance <= *swap_distance,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if prefer_add {
            picks.push(state.take(candidate_index));
            trace!(%target, candidate_quantity, "improve round add");
        } else if let Some((worst_input, _)) = swap {
            let input = state.take(candidate_index);
            state.put_back(&worst_input);
            picks.retain(|pick| *pick != worst_input);
            picks.push(input);
            trace!(%target, candidate_quantity, %worst_input, "improve round swap");
        }
    }

    debug!(
        %target,
        ideal,
        upper,
        total = state.selected_quantity(target),
        "improve round done"
    );
}

/// Smallest `target` quantity among this round's picks; first pick on ties.
fn worst_pick(
    state: &SelectionState,
    target: &SelectionTarget,
    picks: &[TxIn],
) -> Option<(TxIn, u64)> {
    state
        .selected
        .iter()
        .filter(|utxo| picks.contains(&utxo.input))
        .map(|utxo| (utxo.input, target.quantity(utxo.value())))
        .fold(None, |worst: Option<(TxIn, u64)>, (input, quantity)| match worst {
            Some((_, worst_quantity)) if worst_quantity <= quantity => worst,
            _ => Some((input, quantity)),
        })
}

/// Coins the current picks must hold, and the fee budget inside that figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CoinBudget {
    pub fee: u64,
    pub needed: u64,
}

fn coin_budget(
    state: &SelectionState,
    requested: &Value,
    outputs: &[TxOut],
    fee_estimate: u64,
    constraints: &dyn SelectionConstraints,
) -> Result<CoinBudget, SelectionError> {
    let leftover_assets = state
        .selected_value()?
        .assets_only()
        .checked_sub(&requested.assets_only())?;
    let provisional_change = fund_bundles(&asset_bundles(&leftover_assets, constraints), constraints);
    let bundle_coins = total_coins(&provisional_change)?;

    let skeleton = SelectionSkeleton::new(state.selected.len(), outputs, &provisional_change);
    let fee = fee_estimate.max(constraints.compute_minimum_cost(&skeleton));

    let needed = requested
        .coins()
        .checked_add(fee)
        .and_then(|coins| coins.checked_add(bundle_coins))
        .ok_or_else(|| {
            SelectionError::ValueOverflow("coin requirement exceeds the 64-bit range".to_string())
        })?;

    Ok(CoinBudget { fee, needed })
}

/// Add coin until the picks pay for the outputs, the fee budget and the
/// minimum coin of asset change. Asset-free UTxOs are drawn first.
pub(crate) fn coin_top_up(
    state: &mut SelectionState,
    requested: &Value,
    outputs: &[TxOut],
    fee_estimate: u64,
    constraints: &dyn SelectionConstraints,
    rng: &mut dyn RngCore,
) -> Result<CoinBudget, SelectionError> {
    loop {
        let budget = coin_budget(state, requested, outputs, fee_estimate, constraints)?;
        let selected_coins = state.selected_quantity(&SelectionTarget::Coin);
        if selected_coins >= budget.needed {
            return Ok(budget);
        }

        let coin_holders = state.eligible(&SelectionTarget::Coin);
        if coin_holders.is_empty() {
            return Err(SelectionError::UtxoFullyDepleted {
                target: SelectionTarget::Coin.to_string(),
                missing: budget.needed - selected_coins,
            });
        }
        if state.at_limit() {
            return Err(SelectionError::MaximumInputCountExceeded {
                limit: state.limit(),
            });
        }

        let pure = coin_holders
            .iter()
            .copied()
            .filter(|index| !state.remaining[*index].value().has_assets())
            .collect::<Vec<_>>();
        let candidates = if pure.is_empty() { &coin_holders } else { &pure };

        let input = state.take(draw(candidates, rng));
        trace!(%input, needed = budget.needed, "coin top-up pick");
    }
}
