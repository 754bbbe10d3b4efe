//! Checks a [`SelectionResult`] against the guarantees every selector makes.

use crate::error::SelectionError;
use crate::schema::constraints::SelectionConstraints;
use crate::schema::utxo::{TxIn, TxOut, UtxoSet};
use crate::schema::value::Value;
use crate::selection::SelectionResult;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionViolation {
    #[error("Value not conserved: inputs hold {inputs:?}, outputs, change and fee spend {spent:?}")]
    ValueNotConserved { inputs: Value, spent: Value },

    #[error("Input {0} is both selected and remaining")]
    InputSelectedTwice(TxIn),

    #[error(
        "Selected and remaining UTxO do not partition the original set: {missing} missing, {unknown} unknown"
    )]
    PartitionMismatch { missing: usize, unknown: usize },

    #[error("Change output {index} holds {coins} coins, below the minimum {minimum}")]
    ChangeBelowMinimum {
        index: usize,
        coins: u64,
        minimum: u64,
    },

    #[error("Selection spends {count} inputs, above the limit {limit}")]
    TooManyInputs { count: usize, limit: usize },

    #[error("Fee {fee} is below the minimum cost {minimum}")]
    FeeBelowMinimum { fee: u64, minimum: u64 },

    #[error(transparent)]
    Value(#[from] SelectionError),
}

impl SelectionResult {
    /// Verify conservation, partition, minimum change, bounded inputs and
    /// fee coverage. Reports the first violation found.
    ///
    /// # Errors
    /// Returns the first [`SelectionViolation`] found.
    pub fn verify(
        &self,
        original: &UtxoSet,
        outputs: &[TxOut],
        constraints: &dyn SelectionConstraints,
    ) -> Result<(), SelectionViolation> {
        let selection = &self.selection;

        let inputs = selection.total_input_value()?;
        let spent = Value::coalesce(outputs.iter().map(|output| &output.value))?
            .checked_add(&selection.total_change_value()?)?
            .checked_add(&Value::coins_only(selection.fee))?;
        if inputs != spent {
            return Err(SelectionViolation::ValueNotConserved { inputs, spent });
        }

        if let Some(input) = selection
            .inputs
            .inputs()
            .find(|input| self.remaining_utxo.contains(input))
        {
            return Err(SelectionViolation::InputSelectedTwice(*input));
        }
        let mut union = selection.inputs.clone();
        union.extend(self.remaining_utxo.to_vec());
        if union != *original {
            return Err(SelectionViolation::PartitionMismatch {
                missing: original.difference(&union).len(),
                unknown: union.difference(original).len(),
            });
        }

        for (index, change) in selection.change.iter().enumerate() {
            let minimum = constraints.compute_minimum_coin_quantity(change);
            if change.coins() < minimum {
                return Err(SelectionViolation::ChangeBelowMinimum {
                    index,
                    coins: change.coins(),
                    minimum,
                });
            }
        }

        let limit = constraints.compute_selection_limit(outputs);
        if selection.inputs.len() > limit {
            return Err(SelectionViolation::TooManyInputs {
                count: selection.inputs.len(),
                limit,
            });
        }

        let minimum = constraints.compute_minimum_cost(&selection.skeleton(outputs));
        if selection.fee < minimum {
            return Err(SelectionViolation::FeeBelowMinimum {
                fee: selection.fee,
                minimum,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::constraints::{MockSelectionConstraints, NO_CONSTRAINTS};
    use crate::schema::utxo::{Address, TX_HASH_LENGTH, TxHash, Utxo};
    use crate::selection::Selection;

    fn utxo(tag: u8, coins: u64) -> Utxo {
        Utxo::new(
            TxIn::new(TxHash::from_byte_array([tag; TX_HASH_LENGTH]), 0),
            TxOut::new(Address::new("addr_test"), Value::coins_only(coins)),
        )
    }

    fn fixture() -> (UtxoSet, Vec<TxOut>, SelectionResult) {
        let original: UtxoSet = vec![utxo(1, 100), utxo(2, 50)].into();
        let outputs = vec![TxOut::new(Address::new("payee"), Value::coins_only(60))];
        let result = SelectionResult {
            selection: Selection {
                inputs: vec![utxo(1, 100)].into(),
                change: vec![Value::coins_only(30)],
                fee: 10,
            },
            remaining_utxo: vec![utxo(2, 50)].into(),
            fee_iterations: 1,
        };
        (original, outputs, result)
    }

    #[test]
    fn valid_result_passes() {
        let (original, outputs, result) = fixture();
        result
            .verify(&original, &outputs, &NO_CONSTRAINTS)
            .expect("valid result");
    }

    #[test]
    fn unbalanced_fee_is_reported() {
        let (original, outputs, mut result) = fixture();
        result.selection.fee = 11;
        assert!(matches!(
            result.verify(&original, &outputs, &NO_CONSTRAINTS),
            Err(SelectionViolation::ValueNotConserved { .. })
        ));
    }

    #[test]
    fn overlapping_partition_is_reported() {
        let (original, outputs, mut result) = fixture();
        result.remaining_utxo.insert(utxo(1, 100));
        assert!(matches!(
            result.verify(&original, &outputs, &NO_CONSTRAINTS),
            Err(SelectionViolation::InputSelectedTwice(_))
        ));
    }

    #[test]
    fn lost_utxo_is_reported() {
        let (original, outputs, mut result) = fixture();
        result.remaining_utxo = UtxoSet::new();
        assert_eq!(
            result.verify(&original, &outputs, &NO_CONSTRAINTS),
            Err(SelectionViolation::PartitionMismatch {
                missing: 1,
                unknown: 0
            })
        );
    }

    #[test]
    fn small_change_and_low_fee_are_reported() {
        let (original, outputs, result) = fixture();
        let strict = MockSelectionConstraints {
            minimum_coin_quantity: 31,
            ..NO_CONSTRAINTS
        };
        assert!(matches!(
            result.verify(&original, &outputs, &strict),
            Err(SelectionViolation::ChangeBelowMinimum { index: 0, .. })
        ));

        let pricey = MockSelectionConstraints {
            minimum_cost: 20,
            ..NO_CONSTRAINTS
        };
        assert_eq!(
            result.verify(&original, &outputs, &pricey),
            Err(SelectionViolation::FeeBelowMinimum {
                fee: 10,
                minimum: 20
            })
        );
    }
}
