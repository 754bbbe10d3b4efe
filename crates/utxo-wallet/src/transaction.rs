use crate::error::WalletError;

use coin_selection::{Address, Selection, TxIn, TxOut, Value};

use serde::{Deserialize, Serialize};

/// Slot bounds of a transaction. `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityInterval {
    pub invalid_before: Option<u64>,
    pub invalid_hereafter: Option<u64>,
}

/// Transaction body draft, ready for serialization and signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub inputs: Vec<TxIn>,
    /// Requested outputs followed by change outputs.
    pub outputs: Vec<TxOut>,
    pub fee: u64,
    pub validity_interval: ValidityInterval,
}

impl UnsignedTransaction {
    /// # Errors
    /// Returns [`WalletError::Selection`] if the outputs do not sum in range.
    pub fn total_output_value(&self) -> Result<Value, WalletError> {
        Ok(Value::coalesce(
            self.outputs.iter().map(|output| &output.value),
        )?)
    }
}

/// Build the body of a transaction spending `selection` to pay `outputs`.
///
/// Every change value becomes an output to `change_address`, after the
/// requested outputs and in selection order.
///
/// # Errors
/// Returns [`WalletError::InvalidValidityInterval`] if the interval is empty.
pub fn create_transaction_internals(
    change_address: &Address,
    selection: &Selection,
    outputs: &[TxOut],
    validity_interval: ValidityInterval,
) -> Result<UnsignedTransaction, WalletError> {
    if let (Some(invalid_before), Some(invalid_hereafter)) = (
        validity_interval.invalid_before,
        validity_interval.invalid_hereafter,
    ) {
        if invalid_before >= invalid_hereafter {
            return Err(WalletError::InvalidValidityInterval {
                invalid_before,
                invalid_hereafter,
            });
        }
    }

    let outputs = outputs
        .iter()
        .cloned()
        .chain(
            selection
                .change
                .iter()
                .map(|value| TxOut::new(change_address.clone(), value.clone())),
        )
        .collect();

    Ok(UnsignedTransaction {
        inputs: selection.inputs.inputs().copied().collect(),
        outputs,
        fee: selection.fee,
        validity_interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_selection::{TxHash, Utxo, UtxoSet};

    fn selection() -> Selection {
        let inputs: UtxoSet = vec![
            Utxo::new(
                TxIn::new(TxHash::from_byte_array([2; 32]), 1),
                TxOut::new(Address::new("addr_test_wallet"), Value::coins_only(5_000_000)),
            ),
            Utxo::new(
                TxIn::new(TxHash::from_byte_array([1; 32]), 0),
                TxOut::new(Address::new("addr_test_wallet"), Value::coins_only(3_000_000)),
            ),
        ]
        .into();

        Selection {
            inputs,
            change: vec![Value::coins_only(1_300_000), Value::coins_only(500_000)],
            fee: 200_000,
        }
    }

    fn outputs() -> Vec<TxOut> {
        vec![
            TxOut::new(Address::new("addr_test_payee"), Value::coins_only(4_000_000)),
            TxOut::new(Address::new("addr_test_payee"), Value::coins_only(2_000_000)),
        ]
    }

    #[test]
    fn simple_transaction_body() {
        let change_address = Address::new("addr_test_change");
        let interval = ValidityInterval {
            invalid_before: None,
            invalid_hereafter: Some(3_600),
        };

        let tx = create_transaction_internals(&change_address, &selection(), &outputs(), interval)
            .expect("builds body");

        assert_eq!(tx.inputs.len(), 2);
        assert!(tx.inputs[0] < tx.inputs[1]);
        assert_eq!(tx.outputs.len(), 4);
        assert_eq!(&tx.outputs[..2], outputs().as_slice());
        assert!(tx.outputs[2..].iter().all(|output| output.address == change_address));
        assert_eq!(tx.fee, 200_000);
        assert_eq!(tx.validity_interval, interval);

        let spent = tx
            .total_output_value()
            .expect("sum")
            .checked_add(&Value::coins_only(tx.fee))
            .expect("sum");
        assert_eq!(spent, Value::coins_only(8_000_000));
    }

    #[test]
    fn empty_validity_interval_is_rejected() {
        let interval = ValidityInterval {
            invalid_before: Some(10),
            invalid_hereafter: Some(10),
        };

        let err = create_transaction_internals(
            &Address::new("addr_test_change"),
            &selection(),
            &outputs(),
            interval,
        )
        .expect_err("empty interval");
        assert!(matches!(
            err,
            WalletError::InvalidValidityInterval {
                invalid_before: 10,
                invalid_hereafter: 10
            }
        ));
    }
}
