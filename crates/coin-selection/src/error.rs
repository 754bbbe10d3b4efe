use crate::schema::utxo::TxIn;
use crate::schema::value::AssetId;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error(
        "UTxO balance insufficient: outputs and fee require {required} coins, wallet holds {available}"
    )]
    UtxoBalanceInsufficient { required: u64, available: u64 },

    #[error("UTxO fully depleted while selecting {target}: {missing} still missing")]
    UtxoFullyDepleted { target: String, missing: u64 },

    #[error("Input value insufficient for asset {asset}: requested {requested}, available {available}")]
    InputValueInsufficient {
        asset: AssetId,
        requested: u64,
        available: u64,
    },

    #[error("Maximum input count exceeded: selection needs more than {limit} inputs")]
    MaximumInputCountExceeded { limit: usize },

    #[error("Negative value: {0}")]
    NegativeValue(String),

    #[error("Value overflow: {0}")]
    ValueOverflow(String),

    #[error(
        "Selection did not converge after {iterations} fee iterations (last estimate {last_estimate}, required {required})"
    )]
    SelectionConvergenceFailure {
        iterations: usize,
        last_estimate: u64,
        required: u64,
    },

    #[error("Invalid selection policy: {0}")]
    InvalidPolicy(String),
}

impl SelectionError {
    /// Stable kind label for front-ends that map errors to user messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UtxoBalanceInsufficient { .. } => "utxo_balance_insufficient",
            Self::UtxoFullyDepleted { .. } => "utxo_fully_depleted",
            Self::InputValueInsufficient { .. } => "input_value_insufficient",
            Self::MaximumInputCountExceeded { .. } => "maximum_input_count_exceeded",
            Self::NegativeValue(_) => "negative_value",
            Self::ValueOverflow(_) => "value_overflow",
            Self::SelectionConvergenceFailure { .. } => "selection_convergence_failure",
            Self::InvalidPolicy(_) => "invalid_policy",
        }
    }
}

/// Errors raised while decoding identifiers and UTxO lists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("Failed to decode hex string: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid {kind} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("Duplicate input {0}")]
    DuplicateInput(TxIn),
}
