use crate::error::ProviderError;

use coin_selection::{Address, Utxo};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stake pool identifier as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationAndRewards {
    pub delegate: Option<PoolId>,
    /// Reward balance in coins.
    pub rewards: Option<u64>,
}

/// Everything the provider knows about a wallet at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub utxo: Vec<Utxo>,
    pub delegation_and_rewards: DelegationAndRewards,
}

/// Source of wallet state. Implementations talk to an indexer or node.
pub trait UtxoProvider {
    /// UTxOs locked to `addresses`, plus delegation and rewards of the stake key.
    ///
    /// # Errors
    /// Returns [`ProviderError`] if the backend cannot be queried.
    fn utxo_delegation_and_rewards(
        &self,
        addresses: &[Address],
        stake_key_hash: &str,
    ) -> Result<ProviderSnapshot, ProviderError>;
}

/// Address derivation for the wallet's keys. Signing lives elsewhere.
pub trait KeyManager {
    fn derive_address(&self, change: u32, index: u32) -> Address;

    /// Hex-encoded hash of the wallet's stake key.
    fn stake_key_hash(&self) -> String;
}
