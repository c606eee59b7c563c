//! Scripted in-memory client for tests.
//!
//! [`MockSafeClient`] implements every client trait over mutable scripted
//! state: fixed facts for the simple reads, sticky-last queues for the calls
//! that tests drive through several poll iterations, and per-method failure
//! injection. [`MockHandleFactory`] wraps one client and counts handle
//! constructions so rebuild-suppression can be asserted.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;
use safe_sync_types::{
    AddOwnerParams, Address, EthereumTxHash, RemoveOwnerParams, SafeConfig, SafeOperation,
    SafeOperationHash, SafeTxHash, SwapOwnerParams, TransactionDetails, TransactionInput,
    TransactionListEntry, WriteResult,
};

use crate::handle::{HandleFactory, PublicHandle, SignerHandle};
use crate::traits::{OperationReadClient, OperationWriteClient, ReadClient, WriteClient};

#[derive(Default)]
struct Inner {
    address: Option<Address>,
    nonce: u64,
    threshold: usize,
    deployed: bool,
    owners: Vec<Address>,
    balances: HashMap<Address, u128>,
    transaction_lists: VecDeque<Vec<TransactionListEntry>>,
    pending_transactions: Vec<TransactionDetails>,
    transaction_lookups: HashMap<SafeTxHash, VecDeque<Option<TransactionDetails>>>,
    safe_operations: Vec<SafeOperation>,
    pending_safe_operations: Vec<SafeOperation>,
    send_results: VecDeque<WriteResult>,
    confirm_results: VecDeque<WriteResult>,
    operation_send_results: VecDeque<WriteResult>,
    operation_confirm_results: VecDeque<WriteResult>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<String>>,
}

/// Scripted client; all trait methods read and mutate the shared script.
#[derive(Default)]
pub struct MockSafeClient {
    inner: Mutex<Inner>,
}

/// Pop the front of a queue, keeping the final element sticky so repeated
/// polls beyond the script see a stable value.
fn pop_sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    match queue.len() {
        0 => None,
        1 => queue.front().cloned(),
        _ => queue.pop_front(),
    }
}

impl MockSafeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ---- scripting ----

    pub fn script_account(
        &self,
        address: Address,
        nonce: u64,
        threshold: usize,
        deployed: bool,
        owners: Vec<Address>,
    ) {
        let mut inner = self.inner.lock();
        inner.address = Some(address);
        inner.nonce = nonce;
        inner.threshold = threshold;
        inner.deployed = deployed;
        inner.owners = owners;
    }

    pub fn script_balance(&self, address: Address, wei: u128) {
        self.inner.lock().balances.insert(address, wei);
    }

    /// Queue one response for `get_all_transactions`; the last queued list
    /// repeats forever.
    pub fn script_transaction_list(&self, list: Vec<TransactionListEntry>) {
        self.inner.lock().transaction_lists.push_back(list);
    }

    pub fn script_pending_transactions(&self, list: Vec<TransactionDetails>) {
        self.inner.lock().pending_transactions = list;
    }

    /// Queue one response for `get_transaction(hash)`; the last queued
    /// response repeats forever.
    pub fn script_transaction_lookup(&self, hash: SafeTxHash, response: Option<TransactionDetails>) {
        self.inner
            .lock()
            .transaction_lookups
            .entry(hash)
            .or_default()
            .push_back(response);
    }

    pub fn script_safe_operations(&self, list: Vec<SafeOperation>) {
        self.inner.lock().safe_operations = list;
    }

    pub fn script_pending_safe_operations(&self, list: Vec<SafeOperation>) {
        self.inner.lock().pending_safe_operations = list;
    }

    pub fn script_send_result(&self, result: WriteResult) {
        self.inner.lock().send_results.push_back(result);
    }

    pub fn script_confirm_result(&self, result: WriteResult) {
        self.inner.lock().confirm_results.push_back(result);
    }

    pub fn script_operation_send_result(&self, result: WriteResult) {
        self.inner.lock().operation_send_results.push_back(result);
    }

    pub fn script_operation_confirm_result(&self, result: WriteResult) {
        self.inner.lock().operation_confirm_results.push_back(result);
    }

    /// Make the next invocation of `method` fail with `message`.
    pub fn fail_next(&self, method: &'static str, message: impl Into<String>) {
        self.inner
            .lock()
            .failures
            .entry(method)
            .or_default()
            .push_back(message.into());
    }

    /// Number of times `method` has been invoked.
    pub fn call_count(&self, method: &'static str) -> usize {
        self.inner.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Record the call and take a scripted failure, if any.
    fn enter(&self, method: &'static str) -> Result<()> {
        let mut inner = self.inner.lock();
        *inner.calls.entry(method).or_insert(0) += 1;
        if let Some(queue) = inner.failures.get_mut(method) {
            if let Some(message) = queue.pop_front() {
                return Err(anyhow!(message));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReadClient for MockSafeClient {
    async fn get_address(&self) -> Result<Address> {
        self.enter("get_address")?;
        self.inner
            .lock()
            .address
            .clone()
            .ok_or_else(|| anyhow!("no account scripted"))
    }

    async fn get_nonce(&self) -> Result<u64> {
        self.enter("get_nonce")?;
        Ok(self.inner.lock().nonce)
    }

    async fn get_threshold(&self) -> Result<usize> {
        self.enter("get_threshold")?;
        Ok(self.inner.lock().threshold)
    }

    async fn is_deployed(&self) -> Result<bool> {
        self.enter("is_deployed")?;
        Ok(self.inner.lock().deployed)
    }

    async fn get_owners(&self) -> Result<Vec<Address>> {
        self.enter("get_owners")?;
        Ok(self.inner.lock().owners.clone())
    }

    async fn get_balance(&self, address: &Address) -> Result<u128> {
        self.enter("get_balance")?;
        Ok(self
            .inner
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn get_transaction(
        &self,
        safe_tx_hash: &SafeTxHash,
    ) -> Result<Option<TransactionDetails>> {
        self.enter("get_transaction")?;
        let mut inner = self.inner.lock();
        Ok(inner
            .transaction_lookups
            .get_mut(safe_tx_hash)
            .and_then(pop_sticky)
            .flatten())
    }

    async fn get_all_transactions(&self, _address: &Address) -> Result<Vec<TransactionListEntry>> {
        self.enter("get_all_transactions")?;
        let mut inner = self.inner.lock();
        Ok(pop_sticky(&mut inner.transaction_lists).unwrap_or_default())
    }

    async fn get_pending_transactions(&self) -> Result<Vec<TransactionDetails>> {
        self.enter("get_pending_transactions")?;
        Ok(self.inner.lock().pending_transactions.clone())
    }

    async fn wait_for_settlement(&self, _hash: &EthereumTxHash) -> Result<()> {
        self.enter("wait_for_settlement")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl OperationReadClient for MockSafeClient {
    async fn get_safe_operation(&self, hash: &SafeOperationHash) -> Result<Option<SafeOperation>> {
        self.enter("get_safe_operation")?;
        Ok(self
            .inner
            .lock()
            .safe_operations
            .iter()
            .find(|op| &op.safe_operation_hash == hash)
            .cloned())
    }

    async fn get_safe_operations(&self, _address: &Address) -> Result<Vec<SafeOperation>> {
        self.enter("get_safe_operations")?;
        Ok(self.inner.lock().safe_operations.clone())
    }

    async fn get_pending_safe_operations(&self, _address: &Address) -> Result<Vec<SafeOperation>> {
        self.enter("get_pending_safe_operations")?;
        Ok(self.inner.lock().pending_safe_operations.clone())
    }
}

#[async_trait::async_trait]
impl WriteClient for MockSafeClient {
    async fn send(&self, _transactions: Vec<TransactionInput>) -> Result<WriteResult> {
        self.enter("send")?;
        let mut inner = self.inner.lock();
        pop_sticky(&mut inner.send_results).ok_or_else(|| anyhow!("no scripted send result"))
    }

    async fn confirm(&self, safe_tx_hash: &SafeTxHash) -> Result<WriteResult> {
        self.enter("confirm")?;
        if safe_tx_hash.is_empty() {
            bail!("confirm called with an empty hash");
        }
        let mut inner = self.inner.lock();
        pop_sticky(&mut inner.confirm_results).ok_or_else(|| anyhow!("no scripted confirm result"))
    }

    async fn create_add_owner_transaction(
        &self,
        params: AddOwnerParams,
    ) -> Result<TransactionInput> {
        self.enter("create_add_owner_transaction")?;
        let safe = self.inner.lock().address.clone().unwrap_or(Address::from("0x0"));
        Ok(TransactionInput::new(
            safe,
            "0",
            format!("add_owner:{}", params.owner),
        ))
    }

    async fn create_remove_owner_transaction(
        &self,
        params: RemoveOwnerParams,
    ) -> Result<TransactionInput> {
        self.enter("create_remove_owner_transaction")?;
        let safe = self.inner.lock().address.clone().unwrap_or(Address::from("0x0"));
        Ok(TransactionInput::new(
            safe,
            "0",
            format!("remove_owner:{}", params.owner),
        ))
    }

    async fn create_swap_owner_transaction(
        &self,
        params: SwapOwnerParams,
    ) -> Result<TransactionInput> {
        self.enter("create_swap_owner_transaction")?;
        let safe = self.inner.lock().address.clone().unwrap_or(Address::from("0x0"));
        Ok(TransactionInput::new(
            safe,
            "0",
            format!("swap_owner:{}:{}", params.old_owner, params.new_owner),
        ))
    }

    async fn create_change_threshold_transaction(
        &self,
        threshold: usize,
    ) -> Result<TransactionInput> {
        self.enter("create_change_threshold_transaction")?;
        let safe = self.inner.lock().address.clone().unwrap_or(Address::from("0x0"));
        Ok(TransactionInput::new(
            safe,
            "0",
            format!("change_threshold:{threshold}"),
        ))
    }
}

#[async_trait::async_trait]
impl OperationWriteClient for MockSafeClient {
    async fn send_operation_bundle(
        &self,
        _transactions: Vec<TransactionInput>,
    ) -> Result<WriteResult> {
        self.enter("send_operation_bundle")?;
        let mut inner = self.inner.lock();
        pop_sticky(&mut inner.operation_send_results)
            .ok_or_else(|| anyhow!("no scripted operation send result"))
    }

    async fn confirm_operation_bundle(&self, _hash: &SafeOperationHash) -> Result<WriteResult> {
        self.enter("confirm_operation_bundle")?;
        let mut inner = self.inner.lock();
        pop_sticky(&mut inner.operation_confirm_results)
            .ok_or_else(|| anyhow!("no scripted operation confirm result"))
    }
}

/// Handle factory over a shared [`MockSafeClient`], counting constructions.
pub struct MockHandleFactory {
    client: Arc<MockSafeClient>,
    public_builds: AtomicUsize,
    signer_builds: AtomicUsize,
}

impl MockHandleFactory {
    pub fn new(client: Arc<MockSafeClient>) -> Self {
        Self {
            client,
            public_builds: AtomicUsize::new(0),
            signer_builds: AtomicUsize::new(0),
        }
    }

    pub fn client(&self) -> Arc<MockSafeClient> {
        Arc::clone(&self.client)
    }

    pub fn public_builds(&self) -> usize {
        self.public_builds.load(Ordering::SeqCst)
    }

    pub fn signer_builds(&self) -> usize {
        self.signer_builds.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HandleFactory for MockHandleFactory {
    async fn build_public(&self, config: &SafeConfig) -> Result<PublicHandle> {
        self.public_builds.fetch_add(1, Ordering::SeqCst);
        let reader: Arc<dyn ReadClient> = self.client();
        Ok(if config.supports_operation_bundles() {
            PublicHandle::WithOperationBundles {
                reader,
                operations: self.client(),
            }
        } else {
            PublicHandle::Basic(reader)
        })
    }

    async fn build_signer(&self, config: &SafeConfig) -> Result<SignerHandle> {
        self.signer_builds.fetch_add(1, Ordering::SeqCst);
        let writer: Arc<dyn WriteClient> = self.client();
        Ok(if config.supports_operation_bundles() {
            SignerHandle::WithOperationBundles {
                writer,
                operations: self.client(),
            }
        } else {
            SignerHandle::Basic(writer)
        })
    }
}
