pub mod fee_iteration;
pub mod policy;
pub mod verify;

mod change;
mod random_improve;

use crate::error::SelectionError;
use crate::schema::constraints::{SelectionConstraints, SelectionSkeleton};
use crate::schema::utxo::{TxOut, UtxoSet};
use crate::schema::value::Value;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Inputs chosen for a payment, the change they produce and the fee paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub inputs: UtxoSet,
    /// Asset-bearing change first, then coin-only change.
    pub change: Vec<Value>,
    /// Fee paid by the transaction, including any folded dust.
    pub fee: u64,
}

impl Selection {
    /// Shape of the transaction paying `outputs` with this selection.
    #[must_use]
    pub fn skeleton(&self, outputs: &[TxOut]) -> SelectionSkeleton {
        SelectionSkeleton::new(self.inputs.len(), outputs, &self.change)
    }

    /// # Errors
    /// Returns [`SelectionError::ValueOverflow`] if the inputs do not sum in range.
    pub fn total_input_value(&self) -> Result<Value, SelectionError> {
        self.inputs.total_value()
    }

    /// # Errors
    /// Returns [`SelectionError::ValueOverflow`] if the change does not sum in range.
    pub fn total_change_value(&self) -> Result<Value, SelectionError> {
        Value::coalesce(&self.change)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selection: Selection,
    /// Every UTxO of the original set that was not selected.
    pub remaining_utxo: UtxoSet,
    /// Fee iterations used before the fee settled.
    pub fee_iterations: usize,
}

/// Strategy choosing inputs for a set of outputs.
pub trait InputSelector {
    /// Select inputs from `utxo` paying `outputs`.
    ///
    /// # Errors
    /// Fails with the [`SelectionError`] kind describing why no selection exists.
    /// No partial selection is ever returned.
    fn select(
        &self,
        utxo: &UtxoSet,
        outputs: &[TxOut],
        constraints: &dyn SelectionConstraints,
        rng: &mut dyn RngCore,
    ) -> Result<SelectionResult, SelectionError>;
}
