#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Multi-asset Random-Improve input selection for UTxO wallets.
//!
//! [`RandomImprove`] picks inputs for a set of outputs in two rounds per
//! asset, derives change and iterates until the fee matches the transaction
//! shape. Protocol rules reach the selector only through
//! [`SelectionConstraints`].

pub mod error;
pub mod schema;
pub mod selection;

pub use error::{EncodingError, SelectionError};
pub use schema::constraints::{
    MockSelectionConstraints, NO_CONSTRAINTS, ProtocolParameters, ProtocolParametersConstraints,
    SelectionConstraints, SelectionSkeleton,
};
pub use schema::utxo::{Address, TxHash, TxIn, TxOut, Utxo, UtxoSet};
pub use schema::value::{AssetId, Value};
pub use selection::fee_iteration::RandomImprove;
pub use selection::policy::SelectionPolicy;
pub use selection::verify::SelectionViolation;
pub use selection::{InputSelector, Selection, SelectionResult};
