//! Change derivation for a fixed input set.
//!
//! The leftover value (`inputs - outputs - fee`) is turned into change outputs:
//! 1. Leftover assets are packed first-fit, in asset order, into bundles that
//!    do not trip `token_bundle_size_exceeds_limit`.
//! 2. Every bundle is funded with its minimum coin quantity.
//! 3. The remaining coins are split into at most one coin-only output per
//!    requested output, proportionally to the requested coin amounts, so change
//!    looks like the payments it accompanies. The number of parts shrinks until
//!    every part meets the minimum coin quantity.
//! 4. Coins that cannot form a valid part join the last asset bundle, or are
//!    folded into the fee when there is no bundle.
//!
//! Only a coin-only remainder below the minimum coin quantity is ever folded.

use crate::error::SelectionError;
use crate::schema::constraints::SelectionConstraints;
use crate::schema::utxo::TxOut;
use crate::schema::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ChangeOutcome {
    pub change: Vec<Value>,
    /// Coins added to the fee because they could not form a valid output.
    pub folded_coins: u64,
}

/// Pack leftover assets into the fewest bundles the first-fit pass finds.
///
/// Returned bundles carry zero coins.
pub(crate) fn asset_bundles(
    leftover: &Value,
    constraints: &dyn SelectionConstraints,
) -> Vec<Value> {
    let mut bundles = Vec::new();
    let mut current = Value::default();

    for (asset_id, quantity) in leftover.assets() {
        let grown = current.clone().with_asset(asset_id.clone(), *quantity);
        if current.has_assets() && constraints.token_bundle_size_exceeds_limit(&grown) {
            bundles.push(current);
            current = Value::default().with_asset(asset_id.clone(), *quantity);
        } else {
            current = grown;
        }
    }

    if current.has_assets() {
        bundles.push(current);
    }

    bundles
}

/// Give every bundle its minimum coin quantity.
pub(crate) fn fund_bundles(bundles: &[Value], constraints: &dyn SelectionConstraints) -> Vec<Value> {
    bundles
        .iter()
        .map(|bundle| {
            Value::new(
                constraints.compute_minimum_coin_quantity(bundle),
                bundle.assets().clone(),
            )
        })
        .collect()
}

pub(crate) fn total_coins(values: &[Value]) -> Result<u64, SelectionError> {
    values.iter().try_fold(0u64, |sum, value| {
        sum.checked_add(value.coins()).ok_or_else(|| {
            SelectionError::ValueOverflow("coin overflow while summing change".to_string())
        })
    })
}

/// Proportional split of `amount` across the `count` largest weights.
fn split_proportionally(amount: u64, weights: &[u64]) -> Vec<u64> {
    let total_weight: u128 = weights.iter().map(|weight| u128::from(*weight)).sum();
    if total_weight == 0 {
        return Vec::new();
    }

    let mut parts = weights
        .iter()
        .map(|weight| {
            let share = u128::from(amount) * u128::from(*weight) / total_weight;
            // share <= amount, so it always fits back into u64
            u64::try_from(share).unwrap_or(amount)
        })
        .collect::<Vec<_>>();

    let distributed: u64 = parts.iter().sum();
    if let Some(first) = parts.first_mut() {
        *first += amount - distributed;
    }

    parts
}

/// Split a coin remainder into valid coin-only change outputs.
///
/// Returns the parts and the amount that could not be placed.
fn split_coin_change(
    amount: u64,
    outputs: &[TxOut],
    constraints: &dyn SelectionConstraints,
) -> (Vec<u64>, u64) {
    if amount == 0 {
        return (Vec::new(), 0);
    }

    let mut weights = outputs
        .iter()
        .map(|output| output.value.coins())
        .collect::<Vec<_>>();
    if weights.iter().all(|weight| *weight == 0) {
        weights = vec![1; outputs.len().max(1)];
    }
    // Largest weights first; stable so equal weights keep output order.
    weights.sort_by(|a, b| b.cmp(a));

    for count in (1..=weights.len()).rev() {
        let parts = split_proportionally(amount, &weights[..count]);
        let valid = !parts.is_empty()
            && parts.iter().all(|part| {
                *part > 0
                    && *part
                        >= constraints.compute_minimum_coin_quantity(&Value::coins_only(*part))
            });
        if valid {
            return (parts, 0);
        }
    }

    (Vec::new(), amount)
}

/// Turn the leftover of a selection into change outputs.
pub(crate) fn derive_change(
    leftover: &Value,
    outputs: &[TxOut],
    constraints: &dyn SelectionConstraints,
) -> Result<ChangeOutcome, SelectionError> {
    if leftover.is_zero() {
        return Ok(ChangeOutcome::default());
    }

    let mut bundles = fund_bundles(&asset_bundles(leftover, constraints), constraints);
    let bundle_coins = total_coins(&bundles)?;
    let extra = leftover.coins().checked_sub(bundle_coins).ok_or_else(|| {
        SelectionError::NegativeValue(format!(
            "leftover coins {} cannot fund {bundle_coins} required by asset change",
            leftover.coins()
        ))
    })?;

    let (parts, unplaced) = split_coin_change(extra, outputs, constraints);

    let mut folded_coins = 0;
    if unplaced > 0 {
        match bundles.last_mut() {
            Some(last) => {
                let coins = last.coins().checked_add(unplaced).ok_or_else(|| {
                    SelectionError::ValueOverflow("coin overflow while funding change".to_string())
                })?;
                *last = Value::new(coins, last.assets().clone());
            }
            None => folded_coins = unplaced,
        }
    }

    let mut change = bundles;
    change.extend(parts.into_iter().map(Value::coins_only));

    Ok(ChangeOutcome {
        change,
        folded_coins,
    })
}
