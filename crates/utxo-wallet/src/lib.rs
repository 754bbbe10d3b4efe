#![warn(clippy::all, clippy::pedantic)]

//! In-memory UTxO repository: caches wallet state fetched from a provider,
//! runs an [`InputSelector`](coin_selection::InputSelector) over it and
//! drafts the resulting transaction body.

pub mod error;
pub mod provider;
pub mod repository;
pub mod transaction;

pub use error::{ProviderError, WalletError};
pub use provider::{DelegationAndRewards, KeyManager, PoolId, ProviderSnapshot, UtxoProvider};
pub use repository::InMemoryUtxoRepository;
pub use transaction::{UnsignedTransaction, ValidityInterval, create_transaction_internals};
