pub mod constraints;
pub mod utxo;
pub mod value;
