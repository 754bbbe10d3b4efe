//! Ledger values: a base-currency coin quantity plus native asset quantities.
//!
//! Asset maps are sparse. A [`Value`] never stores an asset mapped to zero, so
//! equality and `is_zero` behave the same no matter how the value was built.
//! All arithmetic is checked `u64` arithmetic; nothing in this module touches
//! floating point.

use crate::error::{EncodingError, SelectionError};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of the minting policy hash prefix of an asset id.
pub const POLICY_ID_LENGTH: usize = 28;
/// Upper bound on asset name length.
pub const MAX_ASSET_NAME_LENGTH: usize = 32;

/// Native asset identifier: `policy id || asset name`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(Vec<u8>);

impl AssetId {
    /// # Errors
    /// Returns [`EncodingError::InvalidLength`] unless `bytes` is a policy id
    /// followed by an asset name of at most 32 bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, EncodingError> {
        if bytes.len() < POLICY_ID_LENGTH || bytes.len() > POLICY_ID_LENGTH + MAX_ASSET_NAME_LENGTH
        {
            return Err(EncodingError::InvalidLength {
                kind: "asset id",
                expected: "28..=60",
                actual: bytes.len(),
            });
        }

        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn policy_id(&self) -> &[u8] {
        &self.0[..POLICY_ID_LENGTH]
    }

    #[must_use]
    pub fn asset_name(&self) -> &[u8] {
        &self.0[POLICY_ID_LENGTH..]
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({self})")
    }
}

impl FromStr for AssetId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(hex::decode(s)?)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Wire shape of a [`Value`] before the no-zero-entries invariant is applied.
#[derive(Deserialize)]
struct RawValue {
    coins: u64,
    #[serde(default)]
    assets: BTreeMap<AssetId, u64>,
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        Self::new(raw.coins, raw.assets)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawValue")]
pub struct Value {
    coins: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    assets: BTreeMap<AssetId, u64>,
}

impl Value {
    /// Build a value, dropping zero asset quantities.
    #[must_use]
    pub fn new(coins: u64, assets: BTreeMap<AssetId, u64>) -> Self {
        let assets = assets
            .into_iter()
            .filter(|(_, quantity)| *quantity > 0)
            .collect();
        Self { coins, assets }
    }

    #[must_use]
    pub const fn coins_only(coins: u64) -> Self {
        Self {
            coins,
            assets: BTreeMap::new(),
        }
    }

    /// Set one asset quantity. Setting zero removes the entry.
    #[must_use]
    pub fn with_asset(mut self, asset_id: AssetId, quantity: u64) -> Self {
        if quantity == 0 {
            self.assets.remove(&asset_id);
        } else {
            self.assets.insert(asset_id, quantity);
        }
        self
    }

    #[must_use]
    pub const fn coins(&self) -> u64 {
        self.coins
    }

    #[must_use]
    pub const fn assets(&self) -> &BTreeMap<AssetId, u64> {
        &self.assets
    }

    /// Quantity of one asset; an absent asset is zero.
    #[must_use]
    pub fn asset(&self, asset_id: &AssetId) -> u64 {
        self.assets.get(asset_id).copied().unwrap_or(0)
    }

    pub fn asset_ids(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.keys()
    }

    #[must_use]
    pub fn has_assets(&self) -> bool {
        !self.assets.is_empty()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.coins == 0 && self.assets.is_empty()
    }

    /// Same assets, zero coins.
    #[must_use]
    pub fn assets_only(&self) -> Self {
        Self {
            coins: 0,
            assets: self.assets.clone(),
        }
    }

    /// # Errors
    /// Returns [`SelectionError::ValueOverflow`] if any component leaves the `u64` range.
    pub fn checked_add(&self, other: &Self) -> Result<Self, SelectionError> {
        let coins = self.coins.checked_add(other.coins).ok_or_else(|| {
            SelectionError::ValueOverflow(format!(
                "coin overflow adding {} and {}",
                self.coins, other.coins
            ))
        })?;

        let mut assets = self.assets.clone();
        for (asset_id, quantity) in &other.assets {
            let entry = assets.entry(asset_id.clone()).or_insert(0);
            *entry = entry.checked_add(*quantity).ok_or_else(|| {
                SelectionError::ValueOverflow(format!("asset {asset_id} overflow while adding"))
            })?;
        }

        Ok(Self { coins, assets })
    }

    /// Pointwise subtraction.
    ///
    /// # Errors
    /// Returns [`SelectionError::NegativeValue`] if any component would go negative.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, SelectionError> {
        let coins = self.coins.checked_sub(other.coins).ok_or_else(|| {
            SelectionError::NegativeValue(format!(
                "coins {} - {} is negative",
                self.coins, other.coins
            ))
        })?;

        let mut assets = self.assets.clone();
        for (asset_id, quantity) in &other.assets {
            let current = assets.get(asset_id).copied().unwrap_or(0);
            let remaining = current.checked_sub(*quantity).ok_or_else(|| {
                SelectionError::NegativeValue(format!(
                    "asset {asset_id}: {current} - {quantity} is negative"
                ))
            })?;
            if remaining == 0 {
                assets.remove(asset_id);
            } else {
                assets.insert(asset_id.clone(), remaining);
            }
        }

        Ok(Self { coins, assets })
    }

    /// True iff coins and every asset quantity of `self` dominate `other`.
    #[must_use]
    pub fn is_greater_or_equal(&self, other: &Self) -> bool {
        self.coins >= other.coins
            && other
                .assets
                .iter()
                .all(|(asset_id, quantity)| self.asset(asset_id) >= *quantity)
    }

    /// Sum an arbitrary sequence of values.
    ///
    /// # Errors
    /// Returns [`SelectionError::ValueOverflow`] if the sum leaves the `u64` range.
    pub fn coalesce<'a, I>(values: I) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        values
            .into_iter()
            .try_fold(Self::default(), |total, value| total.checked_add(value))
    }
}
