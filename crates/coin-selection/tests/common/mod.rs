use coin_selection::{
    Address, AssetId, MockSelectionConstraints, TxHash, TxIn, TxOut, Utxo, UtxoSet, Value,
};

use proptest::prelude::*;

pub const ASSET_POOL: usize = 3;

pub fn asset(tag: u8) -> AssetId {
    let mut bytes = vec![tag; 28];
    bytes.extend_from_slice(b"TOKEN");
    AssetId::from_bytes(bytes).expect("valid asset id")
}

pub fn utxo(index: usize, value: Value) -> Utxo {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&(index as u64).to_be_bytes());
    Utxo::new(
        TxIn::new(TxHash::from_byte_array(hash), 0),
        TxOut::new(Address::new("addr_test_wallet"), value),
    )
}

/// Coins in `1..=max_coins` plus up to [`ASSET_POOL`] assets, each present
/// with probability one half.
pub fn value_strategy(max_coins: u64, max_asset: u64) -> impl Strategy<Value = Value> {
    (
        1..=max_coins,
        prop::collection::vec(prop::option::of(1..=max_asset), ASSET_POOL),
    )
        .prop_map(|(coins, quantities)| {
            quantities
                .into_iter()
                .zip(1u8..)
                .fold(Value::coins_only(coins), |value, (quantity, tag)| {
                    match quantity {
                        Some(quantity) => value.with_asset(asset(tag), quantity),
                        None => value,
                    }
                })
        })
}

pub fn utxo_set_strategy(max_coins: u64) -> impl Strategy<Value = UtxoSet> {
    prop::collection::vec(value_strategy(max_coins, 1_000), 1..32).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| utxo(index, value))
            .collect()
    })
}

pub fn outputs_strategy(max_coins: u64) -> impl Strategy<Value = Vec<TxOut>> {
    prop::collection::vec(value_strategy(max_coins, 300), 1..4).prop_map(|values| {
        values
            .into_iter()
            .map(|value| TxOut::new(Address::new("addr_test_payee"), value))
            .collect()
    })
}

pub fn constraints_strategy() -> impl Strategy<Value = MockSelectionConstraints> {
    (0..=2_000u64, 0..=20_000u64, 1..=40usize, 1..=ASSET_POOL).prop_map(
        |(minimum_coin_quantity, minimum_cost, selection_limit, max_token_bundle_assets)| {
            MockSelectionConstraints {
                minimum_coin_quantity,
                minimum_cost,
                selection_limit,
                max_token_bundle_assets,
            }
        },
    )
}

/// Keep the UTxOs whose position has its bit set in `mask`.
pub fn subset(utxo: &UtxoSet, mask: u32) -> UtxoSet {
    utxo.to_vec()
        .into_iter()
        .enumerate()
        .filter(|(position, _)| mask & (1 << position) != 0)
        .map(|(_, utxo)| utxo)
        .collect()
}

/// Coin-only wallet and payments that the wallet can always cover, together
/// with a flat fee and a minimum coin quantity.
pub fn satisfiable_coin_request()
-> impl Strategy<Value = (UtxoSet, Vec<TxOut>, MockSelectionConstraints)> {
    (
        prop::collection::vec(1..=50_000u64, 1..32),
        prop::collection::vec(1..=1_000u64, 1..4),
        0..=100u64,
        0..=20_000u64,
        0..=2_000u64,
    )
        .prop_map(
            |(coins, shares, spend_percent, minimum_cost, minimum_coin_quantity)| {
                let wallet: u64 = coins.iter().sum();
                let minimum_cost = minimum_cost.min(wallet);
                let budget = (wallet - minimum_cost) * spend_percent / 100;
                let total_shares: u64 = shares.iter().sum();

                let available: UtxoSet = coins
                    .into_iter()
                    .enumerate()
                    .map(|(index, coins)| utxo(index, Value::coins_only(coins)))
                    .collect();
                let outputs: Vec<TxOut> = shares
                    .into_iter()
                    .map(|share| {
                        TxOut::new(
                            Address::new("addr_test_payee"),
                            Value::coins_only(budget * share / total_shares),
                        )
                    })
                    .collect();
                let constraints = MockSelectionConstraints {
                    minimum_coin_quantity,
                    minimum_cost,
                    ..MockSelectionConstraints::default()
                };

                (available, outputs, constraints)
            },
        )
}
