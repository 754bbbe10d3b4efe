use coin_selection::SelectionError;

use thiserror::Error;

/// Failures reported by a chain data provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("UTxO repository state poisoned: {0}")]
    StatePoisoned(String),

    #[error("Invalid validity interval: invalid_before {invalid_before} >= invalid_hereafter {invalid_hereafter}")]
    InvalidValidityInterval {
        invalid_before: u64,
        invalid_hereafter: u64,
    },
}
