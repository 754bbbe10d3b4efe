use crate::error::{EncodingError, SelectionError};
use crate::schema::value::Value;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const TX_HASH_LENGTH: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxHash([u8; TX_HASH_LENGTH]);

impl TxHash {
    #[must_use]
    pub const fn from_byte_array(bytes: [u8; TX_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_byte_array(&self) -> &[u8; TX_HASH_LENGTH] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl FromStr for TxHash {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let bytes: [u8; TX_HASH_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| EncodingError::InvalidLength {
                    kind: "transaction hash",
                    expected: "32",
                    actual,
                })?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Input identifier: the transaction that created an output and its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxIn {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl TxIn {
    #[must_use]
    pub const fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

/// Opaque address. The selector never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOut {
    pub address: Address,
    pub value: Value,
}

impl TxOut {
    #[must_use]
    pub const fn new(address: Address, value: Value) -> Self {
        Self { address, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub input: TxIn,
    pub output: TxOut,
}

impl Utxo {
    #[must_use]
    pub const fn new(input: TxIn, output: TxOut) -> Self {
        Self { input, output }
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.output.value
    }
}

/// UTxOs keyed by input identifier. Iteration is always in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UtxoList", into = "Vec<Utxo>")]
pub struct UtxoSet(BTreeMap<TxIn, TxOut>);

impl UtxoSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert one UTxO. Returns `false` if the input was already present.
    pub fn insert(&mut self, utxo: Utxo) -> bool {
        if self.0.contains_key(&utxo.input) {
            return false;
        }
        self.0.insert(utxo.input, utxo.output);
        true
    }

    pub fn remove(&mut self, input: &TxIn) -> Option<Utxo> {
        self.0
            .remove(input)
            .map(|output| Utxo::new(*input, output))
    }

    #[must_use]
    pub fn contains(&self, input: &TxIn) -> bool {
        self.0.contains_key(input)
    }

    #[must_use]
    pub fn get(&self, input: &TxIn) -> Option<&TxOut> {
        self.0.get(input)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &TxIn> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TxIn, &TxOut)> {
        self.0.iter()
    }

    /// Owned copies of every UTxO, in input order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Utxo> {
        self.0
            .iter()
            .map(|(input, output)| Utxo::new(*input, output.clone()))
            .collect()
    }

    /// # Errors
    /// Returns [`SelectionError::ValueOverflow`] if any component of the sum
    /// leaves the `u64` range.
    pub fn total_value(&self) -> Result<Value, SelectionError> {
        Value::coalesce(self.0.values().map(|output| &output.value))
    }

    /// UTxOs of `self` whose input is not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.0
            .iter()
            .filter(|(input, _)| !other.contains(input))
            .map(|(input, output)| (*input, output.clone()))
            .collect::<BTreeMap<_, _>>()
            .into()
    }

    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.0.keys().all(|input| !other.contains(input))
    }
}

impl From<BTreeMap<TxIn, TxOut>> for UtxoSet {
    fn from(map: BTreeMap<TxIn, TxOut>) -> Self {
        Self(map)
    }
}

impl From<Vec<Utxo>> for UtxoSet {
    fn from(utxos: Vec<Utxo>) -> Self {
        utxos.into_iter().collect()
    }
}

/// Wire form of a [`UtxoSet`]; decoding rejects repeated inputs.
#[derive(Deserialize)]
#[serde(transparent)]
struct UtxoList(Vec<Utxo>);

impl TryFrom<UtxoList> for UtxoSet {
    type Error = EncodingError;

    fn try_from(list: UtxoList) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for utxo in list.0 {
            let input = utxo.input;
            if !set.insert(utxo) {
                return Err(EncodingError::DuplicateInput(input));
            }
        }
        Ok(set)
    }
}

impl From<UtxoSet> for Vec<Utxo> {
    fn from(set: UtxoSet) -> Self {
        set.0
            .into_iter()
            .map(|(input, output)| Utxo::new(input, output))
            .collect()
    }
}

impl FromIterator<Utxo> for UtxoSet {
    fn from_iter<T: IntoIterator<Item = Utxo>>(iter: T) -> Self {
        let mut set = Self::new();
        for utxo in iter {
            set.insert(utxo);
        }
        set
    }
}

impl Extend<Utxo> for UtxoSet {
    fn extend<T: IntoIterator<Item = Utxo>>(&mut self, iter: T) {
        for utxo in iter {
            self.insert(utxo);
        }
    }
}
