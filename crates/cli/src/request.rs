use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use coin_selection::{
    ProtocolParameters, ProtocolParametersConstraints, SelectionResult, TxOut, Utxo, UtxoSet,
};
use serde::{Deserialize, Serialize};

/// Input document of the `select` and `check` commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub utxo: Vec<Utxo>,
    pub outputs: Vec<TxOut>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_parameters: Option<ProtocolParameters>,
}

impl SelectionRequest {
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid request.
    pub fn from_path(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// # Errors
    /// Returns an error if the same input is listed twice.
    pub fn utxo_set(&self) -> Result<UtxoSet> {
        let mut set = UtxoSet::default();
        for utxo in &self.utxo {
            if !set.insert(utxo.clone()) {
                bail!("input {} is listed more than once", utxo.input);
            }
        }

        Ok(set)
    }

    /// Constraints from the request's own parameters, or `defaults`.
    #[must_use]
    pub fn constraints(&self, defaults: &ProtocolParameters) -> ProtocolParametersConstraints {
        ProtocolParametersConstraints::new(self.protocol_parameters.unwrap_or(*defaults))
    }
}

/// # Errors
/// Returns an error if the file cannot be read or is not a selection result.
pub fn read_result(path: &Path) -> Result<SelectionResult> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
