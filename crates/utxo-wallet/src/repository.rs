use crate::error::WalletError;
use crate::provider::{DelegationAndRewards, KeyManager, PoolId, UtxoProvider};

use coin_selection::{InputSelector, SelectionConstraints, SelectionResult, TxIn, TxOut, UtxoSet};

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

/// Address role used for the wallet's own UTxOs.
const WALLET_ADDRESS_CHANGE: u32 = 1;
const WALLET_ADDRESS_INDEX: u32 = 0;

#[derive(Debug)]
struct RepositoryState {
    utxo: UtxoSet,
    /// Inputs handed out by `select_and_reserve` and not yet released.
    reserved: BTreeSet<TxIn>,
    delegation_and_rewards: DelegationAndRewards,
    rng: StdRng,
}

impl RepositoryState {
    fn new(rng: StdRng) -> Self {
        Self {
            utxo: UtxoSet::new(),
            reserved: BTreeSet::new(),
            delegation_and_rewards: DelegationAndRewards::default(),
            rng,
        }
    }

    fn available(&self) -> UtxoSet {
        self.utxo
            .to_vec()
            .into_iter()
            .filter(|utxo| !self.reserved.contains(&utxo.input))
            .collect()
    }
}

/// Wallet UTxOs cached in memory, synced from a [`UtxoProvider`].
///
/// Every operation takes the same lock, so a selection and the reservation
/// of its inputs happen atomically with respect to other callers.
pub struct InMemoryUtxoRepository<P, K, S> {
    provider: P,
    key_manager: K,
    selector: S,
    state: Mutex<RepositoryState>,
}

impl<P, K, S> InMemoryUtxoRepository<P, K, S>
where
    P: UtxoProvider,
    K: KeyManager,
    S: InputSelector,
{
    /// Repository drawing selection randomness from the OS.
    pub fn new(provider: P, key_manager: K, selector: S) -> Self {
        Self::with_rng(provider, key_manager, selector, StdRng::from_os_rng())
    }

    /// Repository with reproducible selections.
    pub fn with_seed(provider: P, key_manager: K, selector: S, seed: u64) -> Self {
        Self::with_rng(provider, key_manager, selector, StdRng::seed_from_u64(seed))
    }

    fn with_rng(provider: P, key_manager: K, selector: S, rng: StdRng) -> Self {
        Self {
            provider,
            key_manager,
            selector,
            state: Mutex::new(RepositoryState::new(rng)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RepositoryState>, WalletError> {
        self.state
            .lock()
            .map_err(|e| WalletError::StatePoisoned(e.to_string()))
    }

    /// Fetch the provider snapshot and merge it into the local state.
    ///
    /// # Errors
    /// Returns [`WalletError::Provider`] if the provider query fails.
    pub fn sync(&self) -> Result<(), WalletError> {
        let mut state = self.lock()?;
        self.sync_locked(&mut state)
    }

    fn sync_locked(&self, state: &mut RepositoryState) -> Result<(), WalletError> {
        debug!("syncing in-memory UTxO repository");

        let address = self
            .key_manager
            .derive_address(WALLET_ADDRESS_CHANGE, WALLET_ADDRESS_INDEX);
        let snapshot = self
            .provider
            .utxo_delegation_and_rewards(&[address], &self.key_manager.stake_key_hash())?;
        trace!(?snapshot, "provider snapshot");

        for utxo in snapshot.utxo {
            let input = utxo.input;
            if state.utxo.insert(utxo) {
                debug!(%input, "new UTxO");
            }
        }

        let fetched = snapshot.delegation_and_rewards;
        let stored = &mut state.delegation_and_rewards;
        if stored.delegate != fetched.delegate {
            debug!(delegate = ?fetched.delegate, "delegation stored");
            stored.delegate = fetched.delegate;
        }
        if stored.rewards != fetched.rewards {
            debug!(rewards = ?fetched.rewards, "rewards balance stored");
            stored.rewards = fetched.rewards;
        }

        Ok(())
    }

    fn select_locked(
        &self,
        state: &mut RepositoryState,
        outputs: &[TxOut],
        constraints: &dyn SelectionConstraints,
    ) -> Result<SelectionResult, WalletError> {
        if state.utxo.is_empty() {
            debug!("local UTxO set is empty, syncing");
            self.sync_locked(state)?;
        }

        let available = state.available();
        Ok(self
            .selector
            .select(&available, outputs, constraints, &mut state.rng)?)
    }

    /// Select inputs paying `outputs` from the unreserved UTxOs.
    ///
    /// Syncs first when nothing is cached. The chosen inputs stay available to
    /// later calls; use [`Self::select_and_reserve`] to hold them.
    ///
    /// # Errors
    /// Propagates provider failures and every [`coin_selection::SelectionError`].
    pub fn select_inputs(
        &self,
        outputs: &[TxOut],
        constraints: &dyn SelectionConstraints,
    ) -> Result<SelectionResult, WalletError> {
        let mut state = self.lock()?;
        self.select_locked(&mut state, outputs, constraints)
    }

    /// Select inputs and reserve them under the same lock.
    ///
    /// # Errors
    /// Same as [`Self::select_inputs`]; nothing is reserved on failure.
    pub fn select_and_reserve(
        &self,
        outputs: &[TxOut],
        constraints: &dyn SelectionConstraints,
    ) -> Result<SelectionResult, WalletError> {
        let mut state = self.lock()?;
        let result = self.select_locked(&mut state, outputs, constraints)?;

        state
            .reserved
            .extend(result.selection.inputs.inputs().copied());
        debug!(
            reserved = result.selection.inputs.len(),
            total_reserved = state.reserved.len(),
            "inputs reserved"
        );

        Ok(result)
    }

    /// Return reserved inputs to the pool. Returns how many were reserved.
    ///
    /// # Errors
    /// Returns [`WalletError::StatePoisoned`] if the state lock is poisoned.
    pub fn release<'a>(
        &self,
        inputs: impl IntoIterator<Item = &'a TxIn>,
    ) -> Result<usize, WalletError> {
        let mut state = self.lock()?;
        let released = inputs
            .into_iter()
            .filter(|input| state.reserved.remove(*input))
            .count();
        debug!(released, "inputs released");
        Ok(released)
    }

    /// # Errors
    /// Returns [`WalletError::StatePoisoned`] if the state lock is poisoned.
    pub fn all_utxos(&self) -> Result<UtxoSet, WalletError> {
        Ok(self.lock()?.utxo.clone())
    }

    /// UTxOs not currently reserved.
    ///
    /// # Errors
    /// Returns [`WalletError::StatePoisoned`] if the state lock is poisoned.
    pub fn available_utxos(&self) -> Result<UtxoSet, WalletError> {
        Ok(self.lock()?.available())
    }

    /// # Errors
    /// Returns [`WalletError::StatePoisoned`] if the state lock is poisoned.
    pub fn rewards(&self) -> Result<Option<u64>, WalletError> {
        Ok(self.lock()?.delegation_and_rewards.rewards)
    }

    /// # Errors
    /// Returns [`WalletError::StatePoisoned`] if the state lock is poisoned.
    pub fn delegation(&self) -> Result<Option<PoolId>, WalletError> {
        Ok(self.lock()?.delegation_and_rewards.delegate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ProviderSnapshot;

    use coin_selection::{
        Address, MockSelectionConstraints, NO_CONSTRAINTS, RandomImprove, SelectionError, TxHash,
        Utxo, Value,
    };

    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        snapshot: Result<ProviderSnapshot, ProviderError>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(snapshot: ProviderSnapshot) -> Self {
            Self {
                snapshot: Ok(snapshot),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl UtxoProvider for StubProvider {
        fn utxo_delegation_and_rewards(
            &self,
            addresses: &[Address],
            stake_key_hash: &str,
        ) -> Result<ProviderSnapshot, ProviderError> {
            assert_eq!(addresses, &[Address::new("addr_test_1_0")]);
            assert_eq!(stake_key_hash, "5ca1ab1e");
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.snapshot.clone()
        }
    }

    struct StubKeyManager;

    impl KeyManager for StubKeyManager {
        fn derive_address(&self, change: u32, index: u32) -> Address {
            Address::new(format!("addr_test_{change}_{index}"))
        }

        fn stake_key_hash(&self) -> String {
            "5ca1ab1e".to_string()
        }
    }

    fn utxo(tag: u8, coins: u64) -> Utxo {
        Utxo::new(
            TxIn::new(TxHash::from_byte_array([tag; 32]), 0),
            TxOut::new(Address::new("addr_test_1_0"), Value::coins_only(coins)),
        )
    }

    fn snapshot() -> ProviderSnapshot {
        ProviderSnapshot {
            utxo: vec![
                utxo(1, 5_000_000),
                utxo(2, 3_000_000),
                utxo(3, 2_000_000),
            ],
            delegation_and_rewards: DelegationAndRewards {
                delegate: Some(PoolId("pool1abc".to_string())),
                rewards: Some(33_333),
            },
        }
    }

    fn pay(coins: u64) -> Vec<TxOut> {
        vec![TxOut::new(
            Address::new("addr_test_payee"),
            Value::coins_only(coins),
        )]
    }

    fn repository(
        provider: StubProvider,
    ) -> InMemoryUtxoRepository<StubProvider, StubKeyManager, RandomImprove> {
        InMemoryUtxoRepository::with_seed(provider, StubKeyManager, RandomImprove::default(), 7)
    }

    #[test]
    fn sync_stores_utxo_delegation_and_rewards() {
        let repository = repository(StubProvider::new(snapshot()));
        repository.sync().expect("sync");
        repository.sync().expect("second sync is idempotent");

        assert_eq!(repository.all_utxos().expect("utxos").len(), 3);
        assert_eq!(repository.rewards().expect("rewards"), Some(33_333));
        assert_eq!(
            repository.delegation().expect("delegation"),
            Some(PoolId("pool1abc".to_string()))
        );
    }

    #[test]
    fn select_inputs_syncs_an_empty_repository_once() {
        let repository = repository(StubProvider::new(snapshot()));

        let result = repository
            .select_inputs(&pay(4_000_000), &NO_CONSTRAINTS)
            .expect("selection succeeds");
        assert!(result.selection.inputs.total_value().expect("sum").coins() >= 4_000_000);

        repository
            .select_inputs(&pay(1_000_000), &NO_CONSTRAINTS)
            .expect("selection succeeds");
        assert_eq!(repository.provider.calls.load(Ordering::SeqCst), 1);
        // plain selection reserves nothing
        assert_eq!(repository.available_utxos().expect("available").len(), 3);
    }

    #[test]
    fn reserved_inputs_are_not_selected_again_until_released() {
        let repository = repository(StubProvider::new(snapshot()));

        let first = repository
            .select_and_reserve(&pay(1_000_000), &NO_CONSTRAINTS)
            .expect("first selection");
        let second = repository
            .select_and_reserve(&pay(1_000_000), &NO_CONSTRAINTS)
            .expect("second selection");
        assert!(first.selection.inputs.is_disjoint(&second.selection.inputs));

        let reserved = first.selection.inputs.len() + second.selection.inputs.len();
        assert_eq!(
            repository.available_utxos().expect("available").len(),
            3 - reserved
        );

        let released = repository
            .release(first.selection.inputs.inputs())
            .expect("release");
        assert_eq!(released, first.selection.inputs.len());
        assert_eq!(
            repository.release(first.selection.inputs.inputs()).expect("release"),
            0
        );
    }

    #[test]
    fn selection_errors_propagate_and_reserve_nothing() {
        let repository = repository(StubProvider::new(snapshot()));

        let err = repository
            .select_and_reserve(&pay(50_000_000), &NO_CONSTRAINTS)
            .expect_err("wallet too small");
        assert!(matches!(
            err,
            WalletError::Selection(SelectionError::UtxoBalanceInsufficient { .. })
        ));
        assert_eq!(repository.available_utxos().expect("available").len(), 3);
    }

    #[test]
    fn provider_errors_propagate() {
        let provider = StubProvider {
            snapshot: Err(ProviderError::Unavailable("connection refused".to_string())),
            calls: AtomicUsize::new(0),
        };
        let repository = repository(provider);

        let err = repository
            .select_inputs(&pay(1), &MockSelectionConstraints::default())
            .expect_err("provider down");
        assert!(matches!(err, WalletError::Provider(ProviderError::Unavailable(_))));
    }
}
