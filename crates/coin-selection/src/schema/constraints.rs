//! Protocol-dependent limits the selector consults but never hardcodes.
//!
//! [`SelectionConstraints`] is the seam between the selection algorithm and the
//! ledger rules. Two implementations ship with the crate:
//! - [`ProtocolParametersConstraints`] derives every limit from
//!   [`ProtocolParameters`] using byte-size estimates of the transaction shape;
//! - [`MockSelectionConstraints`] returns fixed answers for tests and tooling.
//!
//! # Size estimates
//!
//! Costs are computed from a [`SelectionSkeleton`], not from a serialized
//! transaction. The estimate charges:
//! - `TX_OVERHEAD_BYTES` once;
//! - `INPUT_BYTES` per input (outpoint plus one key witness);
//! - `OUTPUT_BASE_BYTES` plus the value size per output.
//!
//! Value size counts a coin field, then per policy the 28-byte hash and per
//! asset its name and quantity, each with one byte of framing.

use crate::schema::utxo::TxOut;
use crate::schema::value::{AssetId, Value};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

const TX_OVERHEAD_BYTES: u64 = 50;
const INPUT_BYTES: u64 = 141;
const OUTPUT_BASE_BYTES: u64 = 59;
const COIN_BYTES: u64 = 9;
const MULTI_ASSET_HEADER_BYTES: u64 = 3;
const POLICY_BYTES: u64 = 29;
const ASSET_FRAMING_BYTES: u64 = 10;

/// Words of a UTxO entry excluding its value.
const UTXO_ENTRY_SIZE_WITHOUT_VALUE_WORDS: u64 = 27;
/// Words of a coin-only UTxO entry.
const COIN_ONLY_UTXO_SIZE_WORDS: u64 = 29;
const BUNDLE_BASE_WORDS: u64 = 6;
const ASSET_WORD_BYTES: u64 = 12;
const POLICY_ID_WORD_BYTES: u64 = 28;
const WORD_BYTES: u64 = 8;

/// Shape of a candidate transaction handed to the cost function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSkeleton {
    pub input_count: usize,
    /// Requested outputs followed by proposed change outputs.
    pub outputs: Vec<Value>,
}

impl SelectionSkeleton {
    #[must_use]
    pub fn new(input_count: usize, requested: &[TxOut], change: &[Value]) -> Self {
        let outputs = requested
            .iter()
            .map(|output| output.value.clone())
            .chain(change.iter().cloned())
            .collect();

        Self {
            input_count,
            outputs,
        }
    }
}

pub trait SelectionConstraints {
    /// Smallest coin quantity an output carrying `value`'s assets may hold.
    fn compute_minimum_coin_quantity(&self, value: &Value) -> u64;

    /// Minimum fee for a transaction of the given shape.
    fn compute_minimum_cost(&self, skeleton: &SelectionSkeleton) -> u64;

    /// Maximum number of inputs a transaction paying `outputs` may spend.
    fn compute_selection_limit(&self, outputs: &[TxOut]) -> usize;

    /// Whether a single output holding `value` would be too large.
    fn token_bundle_size_exceeds_limit(&self, _value: &Value) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParameters {
    /// Fee per estimated byte.
    pub min_fee_a: u64,
    /// Constant fee per transaction.
    pub min_fee_b: u64,
    pub min_utxo_value: u64,
    pub max_tx_size: u64,
    pub max_value_size: u64,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            min_utxo_value: 1_000_000,
            max_tx_size: 16_384,
            max_value_size: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolParametersConstraints {
    pub params: ProtocolParameters,
}

impl ProtocolParametersConstraints {
    #[must_use]
    pub const fn new(params: ProtocolParameters) -> Self {
        Self { params }
    }
}

impl From<ProtocolParameters> for ProtocolParametersConstraints {
    fn from(params: ProtocolParameters) -> Self {
        Self::new(params)
    }
}

fn distinct_policies(value: &Value) -> usize {
    value
        .asset_ids()
        .map(AssetId::policy_id)
        .collect::<BTreeSet<_>>()
        .len()
}

fn total_asset_name_bytes(value: &Value) -> u64 {
    value
        .asset_ids()
        .map(|asset_id| asset_id.asset_name().len() as u64)
        .sum()
}

/// Estimated serialized size of a value in bytes.
#[must_use]
pub fn estimated_value_size(value: &Value) -> u64 {
    if !value.has_assets() {
        return COIN_BYTES;
    }

    let policies = distinct_policies(value) as u64;
    let assets = value.assets().len() as u64;

    COIN_BYTES
        + MULTI_ASSET_HEADER_BYTES
        + policies * POLICY_BYTES
        + assets * ASSET_FRAMING_BYTES
        + total_asset_name_bytes(value)
}

#[must_use]
pub fn estimated_output_size(value: &Value) -> u64 {
    OUTPUT_BASE_BYTES + estimated_value_size(value)
}

#[must_use]
pub fn estimated_tx_size(skeleton: &SelectionSkeleton) -> u64 {
    let outputs: u64 = skeleton.outputs.iter().map(estimated_output_size).sum();
    TX_OVERHEAD_BYTES
        .saturating_add((skeleton.input_count as u64).saturating_mul(INPUT_BYTES))
        .saturating_add(outputs)
}

/// Size of the asset bundle in words: `6 + ceil((assets*12 + names + policies*28) / 8)`.
fn bundle_size_words(value: &Value) -> u64 {
    let assets = value.assets().len() as u64;
    let policies = distinct_policies(value) as u64;
    let bytes = assets * ASSET_WORD_BYTES
        + total_asset_name_bytes(value)
        + policies * POLICY_ID_WORD_BYTES;

    BUNDLE_BASE_WORDS + bytes.div_ceil(WORD_BYTES)
}

impl SelectionConstraints for ProtocolParametersConstraints {
    fn compute_minimum_coin_quantity(&self, value: &Value) -> u64 {
        let min_utxo_value = self.params.min_utxo_value;
        if !value.has_assets() {
            return min_utxo_value;
        }

        let coins_per_word = min_utxo_value / COIN_ONLY_UTXO_SIZE_WORDS;
        let scaled = coins_per_word
            .saturating_mul(UTXO_ENTRY_SIZE_WITHOUT_VALUE_WORDS + bundle_size_words(value));

        min_utxo_value.max(scaled)
    }

    fn compute_minimum_cost(&self, skeleton: &SelectionSkeleton) -> u64 {
        self.params
            .min_fee_a
            .saturating_mul(estimated_tx_size(skeleton))
            .saturating_add(self.params.min_fee_b)
    }

    fn compute_selection_limit(&self, outputs: &[TxOut]) -> usize {
        // Leave room for one change output per requested output.
        let output_bytes: u64 = outputs
            .iter()
            .map(|output| estimated_output_size(&output.value))
            .sum();
        let change_allowance = (outputs.len().max(1) as u64)
            .saturating_mul(estimated_output_size(&Value::coins_only(0)));
        let available = self
            .params
            .max_tx_size
            .saturating_sub(TX_OVERHEAD_BYTES)
            .saturating_sub(output_bytes)
            .saturating_sub(change_allowance);

        usize::try_from(available / INPUT_BYTES).unwrap_or(usize::MAX)
    }

    fn token_bundle_size_exceeds_limit(&self, value: &Value) -> bool {
        estimated_value_size(value) > self.params.max_value_size
    }
}

/// Fixed-answer constraints for tests and offline tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSelectionConstraints {
    pub minimum_coin_quantity: u64,
    pub minimum_cost: u64,
    pub selection_limit: usize,
    /// Largest number of distinct assets one output may carry.
    pub max_token_bundle_assets: usize,
}

/// No fee, no minimum coin quantity, no input or bundle limits.
pub const NO_CONSTRAINTS: MockSelectionConstraints = MockSelectionConstraints {
    minimum_coin_quantity: 0,
    minimum_cost: 0,
    selection_limit: usize::MAX,
    max_token_bundle_assets: usize::MAX,
};

impl Default for MockSelectionConstraints {
    fn default() -> Self {
        NO_CONSTRAINTS
    }
}

impl SelectionConstraints for MockSelectionConstraints {
    fn compute_minimum_coin_quantity(&self, _value: &Value) -> u64 {
        self.minimum_coin_quantity
    }

    fn compute_minimum_cost(&self, _skeleton: &SelectionSkeleton) -> u64 {
        self.minimum_cost
    }

    fn compute_selection_limit(&self, _outputs: &[TxOut]) -> usize {
        self.selection_limit
    }

    fn token_bundle_size_exceeds_limit(&self, value: &Value) -> bool {
        value.assets().len() > self.max_token_bundle_assets
    }
}
