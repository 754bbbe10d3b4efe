//! Random-Improve wrapped in a bounded fee fixed-point loop.
//!
//! The cost of a transaction depends on how many inputs and change outputs it
//! has, which is only known after selection. Each iteration tops the inputs up
//! to the current fee estimate, derives change, and prices the result:
//! - price equals the budget: done;
//! - price below the budget: change is re-derived with the lower fee;
//! - price above the budget: the price becomes the next estimate.
//!
//! Inputs only ever grow between iterations and the estimate only rises, so
//! the loop settles quickly for any fee function that is monotone in the
//! transaction shape.

use crate::error::SelectionError;
use crate::schema::constraints::{SelectionConstraints, SelectionSkeleton};
use crate::schema::utxo::{TxOut, UtxoSet};
use crate::schema::value::Value;
use crate::selection::change::{ChangeOutcome, derive_change};
use crate::selection::policy::SelectionPolicy;
use crate::selection::random_improve::{
    SelectionState, SelectionTarget, asset_targets, check_balance, coin_top_up, improve_round,
    random_round,
};
use crate::selection::{InputSelector, Selection, SelectionResult};

use std::cmp::Ordering;

use rand::RngCore;
use tracing::{debug, warn};

/// Multi-asset Random-Improve input selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomImprove {
    policy: SelectionPolicy,
}

impl RandomImprove {
    /// # Errors
    /// Returns [`SelectionError::InvalidPolicy`] if the policy does not validate.
    pub fn new(policy: SelectionPolicy) -> Result<Self, SelectionError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    #[must_use]
    pub const fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }
}

/// Change and fee for a fixed input set at a given fee budget.
struct Settlement {
    change: Vec<Value>,
    /// Budget plus any coins folded into the fee.
    fee: u64,
    /// Minimum cost of the transaction this settlement describes.
    required: u64,
}

fn settle(
    selected: &Value,
    input_count: usize,
    requested: &Value,
    outputs: &[TxOut],
    fee: u64,
    constraints: &dyn SelectionConstraints,
) -> Result<Settlement, SelectionError> {
    let leftover = selected
        .checked_sub(requested)?
        .checked_sub(&Value::coins_only(fee))?;
    let ChangeOutcome {
        change,
        folded_coins,
    } = derive_change(&leftover, outputs, constraints)?;

    let required =
        constraints.compute_minimum_cost(&SelectionSkeleton::new(input_count, outputs, &change));

    Ok(Settlement {
        change,
        fee: fee + folded_coins,
        required,
    })
}

impl InputSelector for RandomImprove {
    fn select(
        &self,
        utxo: &UtxoSet,
        outputs: &[TxOut],
        constraints: &dyn SelectionConstraints,
        rng: &mut dyn RngCore,
    ) -> Result<SelectionResult, SelectionError> {
        let requested = Value::coalesce(outputs.iter().map(|output| &output.value))?;

        let mut estimate =
            constraints.compute_minimum_cost(&SelectionSkeleton::new(0, outputs, &[]));
        check_balance(utxo, &requested, estimate)?;

        let limit = constraints.compute_selection_limit(outputs);
        let mut state = SelectionState::new(utxo, limit);

        let targets = asset_targets(&requested)
            .into_iter()
            .chain(std::iter::once(SelectionTarget::Coin));
        for target in targets {
            let requirement = match target {
                SelectionTarget::Coin => requested.coins().saturating_add(estimate),
                SelectionTarget::Asset(_) => target.quantity(&requested),
            };
            let paying_outputs = outputs
                .iter()
                .filter(|output| target.quantity(&output.value) > 0)
                .count();

            let mut picks = random_round(&mut state, &target, requirement, &self.policy, rng)?;
            improve_round(
                &mut state,
                &target,
                requirement,
                paying_outputs,
                &mut picks,
                &self.policy,
                rng,
            );
        }

        let mut required = estimate;
        for iteration in 1..=self.policy.max_fee_iterations {
            check_balance(utxo, &requested, estimate)?;
            let budget = coin_top_up(&mut state, &requested, outputs, estimate, constraints, rng)?;

            let selected = state.selected_value()?;
            let input_count = state.selected().len();
            let settlement = settle(
                &selected,
                input_count,
                &requested,
                outputs,
                budget.fee,
                constraints,
            )?;
            required = settlement.required;

            debug!(
                iteration,
                inputs = input_count,
                budget = budget.fee,
                required,
                "fee iteration"
            );

            let settlement = match required.cmp(&budget.fee) {
                Ordering::Equal => settlement,
                Ordering::Less => {
                    let lowered = settle(
                        &selected,
                        input_count,
                        &requested,
                        outputs,
                        required,
                        constraints,
                    )?;
                    // Extra change outputs can make the lowered fee too low;
                    // overpaying with the first settlement is always valid.
                    if lowered.required <= required {
                        lowered
                    } else {
                        settlement
                    }
                }
                Ordering::Greater => {
                    estimate = required;
                    continue;
                }
            };

            let inputs = state.selected_set();
            let remaining_utxo = utxo.difference(&inputs);
            debug!(
                inputs = inputs.len(),
                change = settlement.change.len(),
                fee = settlement.fee,
                "selection settled"
            );

            return Ok(SelectionResult {
                selection: Selection {
                    inputs,
                    change: settlement.change,
                    fee: settlement.fee,
                },
                remaining_utxo,
                fee_iterations: iteration,
            });
        }

        warn!(
            iterations = self.policy.max_fee_iterations,
            last_estimate = estimate,
            required,
            "fee estimate did not converge"
        );
        Err(SelectionError::SelectionConvergenceFailure {
            iterations: self.policy.max_fee_iterations,
            last_estimate: estimate,
            required,
        })
    }
}
