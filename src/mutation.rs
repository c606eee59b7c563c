//! Mutation composer.
//!
//! [`Mutation`] wraps one write operation against the signer handle as a
//! trackable state machine: `Idle -> Pending -> (Success | Error)`, re-entrant
//! from either terminal state. Two invocation forms share the same state:
//! `invoke` is fire-and-forget (failures observable only through the state),
//! `invoke_async` resolves with the outcome. Nothing retries automatically;
//! every call is a fresh attempt.
//!
//! [`SafeWrites`] builds the concrete write operations. Each validates its
//! preconditions before touching the client - an absent signer or an empty
//! required parameter rejects the mutation without a network call - and on
//! success hands the result to the invalidation router, waiting out
//! settlement and indexing where the result shape demands it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use safe_sync_client::{ReadClient, SignerHandle};
use safe_sync_types::{
    AddOwnerParams, RemoveOwnerParams, SafeConfig, SafeOperationHash, SafeTxHash, SwapOwnerParams,
    TransactionInput, WriteResult,
};
use tracing::debug;

use crate::cache::CacheContext;
use crate::invalidate::route_after_write;
use crate::keys::{MutationKey, WriteKind};
use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::state::SharedError;

/// Lifecycle of a write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// Shared state of a mutation, updated by both invocation forms.
#[derive(Debug, Clone)]
pub struct MutationState<O> {
    pub status: MutationStatus,
    pub data: Option<O>,
    pub error: Option<SharedError>,
}

impl<O> Default for MutationState<O> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
        }
    }
}

type OpFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O>> + Send + Sync>;
type OnSuccess<O> = Arc<dyn Fn(O) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A trackable write operation bound to a mutation key.
pub struct Mutation<I, O> {
    key: MutationKey,
    state: Arc<Mutex<MutationState<O>>>,
    op: OpFn<I, O>,
    on_success: Option<OnSuccess<O>>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    pub fn new(key: MutationKey, op: OpFn<I, O>) -> Self {
        Self {
            key,
            state: Arc::new(Mutex::new(MutationState::default())),
            op,
            on_success: None,
        }
    }

    /// Attach a callback that runs after the operation succeeds, before the
    /// mutation is considered settled. A failing callback fails the
    /// mutation.
    pub fn with_on_success(mut self, on_success: OnSuccess<O>) -> Self {
        self.on_success = Some(on_success);
        self
    }

    pub fn key(&self) -> &MutationKey {
        &self.key
    }

    pub fn state(&self) -> MutationState<O> {
        self.state.lock().clone()
    }

    pub fn status(&self) -> MutationStatus {
        self.state.lock().status
    }

    /// Fire-and-forget invocation. The rejected outcome is swallowed; the
    /// caller observes failure only through the shared state.
    pub fn invoke(&self, input: I) {
        let state = Arc::clone(&self.state);
        let op = Arc::clone(&self.op);
        let on_success = self.on_success.clone();
        let key = self.key.clone();
        tokio::spawn(async move {
            let _ = run(&key, &state, &op, on_success.as_ref(), input).await;
        });
    }

    /// Awaitable invocation; resolves with the operation's result or its
    /// error, updating the same shared state as [`invoke`](Self::invoke).
    pub async fn invoke_async(&self, input: I) -> Result<O, SharedError> {
        run(
            &self.key,
            &self.state,
            &self.op,
            self.on_success.as_ref(),
            input,
        )
        .await
    }
}

async fn run<I, O: Clone>(
    key: &MutationKey,
    state: &Arc<Mutex<MutationState<O>>>,
    op: &OpFn<I, O>,
    on_success: Option<&OnSuccess<O>>,
    input: I,
) -> Result<O, SharedError> {
    {
        let mut state = state.lock();
        state.status = MutationStatus::Pending;
        state.data = None;
        state.error = None;
    }
    debug!(kind = ?key.kind, "mutation started");

    let outcome = match (op)(input).await {
        Ok(output) => {
            if let Some(callback) = on_success {
                match (callback)(output.clone()).await {
                    Ok(()) => Ok(output),
                    Err(err) => Err(err),
                }
            } else {
                Ok(output)
            }
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(output) => {
            let mut state = state.lock();
            state.status = MutationStatus::Success;
            state.data = Some(output.clone());
            debug!(kind = ?key.kind, "mutation succeeded");
            Ok(output)
        }
        Err(err) => {
            let shared: SharedError = Arc::new(err);
            let mut state = state.lock();
            state.status = MutationStatus::Error;
            state.error = Some(Arc::clone(&shared));
            debug!(kind = ?key.kind, error = %shared, "mutation failed");
            Err(shared)
        }
    }
}

/// Builds the concrete write operations for the active configuration.
pub struct SafeWrites {
    ctx: Arc<CacheContext>,
    config: SafeConfig,
    signer: Option<SignerHandle>,
    poll_interval: Duration,
}

impl SafeWrites {
    pub fn new(ctx: Arc<CacheContext>, config: SafeConfig, signer: Option<SignerHandle>) -> Self {
        Self {
            ctx,
            config,
            signer,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the indexing-poll interval (tests use a short one).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &SafeConfig {
        &self.config
    }

    pub fn signer(&self) -> Option<&SignerHandle> {
        self.signer.as_ref()
    }

    fn require_signer(signer: &Option<SignerHandle>) -> Result<SignerHandle> {
        signer
            .clone()
            .ok_or_else(|| anyhow!("Signer client is not available"))
    }

    /// The post-success invalidation routing, shared by every write.
    fn routing(&self) -> OnSuccess<WriteResult> {
        let ctx = Arc::clone(&self.ctx);
        let config = self.config.clone();
        let signer = self.signer.clone();
        let poll_interval = self.poll_interval;
        Arc::new(move |result: WriteResult| {
            let ctx = Arc::clone(&ctx);
            let config = config.clone();
            let signer = signer.clone();
            Box::pin(async move {
                let reader: Option<Arc<dyn ReadClient>> = signer.as_ref().map(|handle| {
                    let reader: Arc<dyn ReadClient> = handle.writer().clone();
                    reader
                });
                route_after_write(&ctx, &config, reader.as_ref(), &result, poll_interval).await
            })
        })
    }

    fn mutation<I>(
        &self,
        kind: WriteKind,
        op: OpFn<I, WriteResult>,
    ) -> Mutation<I, WriteResult>
    where
        I: Send + 'static,
    {
        Mutation::new(MutationKey::of(kind, &self.config), op).with_on_success(self.routing())
    }

    /// Propose or execute a batch of transactions.
    pub fn send_transaction(&self) -> Mutation<Vec<TransactionInput>, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::SendTransaction,
            Arc::new(move |transactions: Vec<TransactionInput>| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    signer.writer().send(transactions).await
                })
            }),
        )
    }

    /// Confirm a pending proposal by its application-layer hash.
    pub fn confirm_transaction(&self) -> Mutation<SafeTxHash, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::ConfirmTransaction,
            Arc::new(move |safe_tx_hash: SafeTxHash| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    if safe_tx_hash.is_empty() {
                        bail!("`safe_tx_hash` parameter must not be empty");
                    }
                    signer.writer().confirm(&safe_tx_hash).await
                })
            }),
        )
    }

    /// Submit a batch as a gas-abstracted operation bundle.
    pub fn send_operation_bundle(&self) -> Mutation<Vec<TransactionInput>, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::SendOperationBundle,
            Arc::new(move |transactions: Vec<TransactionInput>| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    let operations = Arc::clone(signer.operations()?);
                    operations.send_operation_bundle(transactions).await
                })
            }),
        )
    }

    pub fn confirm_operation_bundle(&self) -> Mutation<SafeOperationHash, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::ConfirmOperationBundle,
            Arc::new(move |hash: SafeOperationHash| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    if hash.is_empty() {
                        bail!("`safe_operation_hash` parameter must not be empty");
                    }
                    let operations = Arc::clone(signer.operations()?);
                    operations.confirm_operation_bundle(&hash).await
                })
            }),
        )
    }

    /// Create and send an add-owner ownership change.
    pub fn add_owner(&self) -> Mutation<AddOwnerParams, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::AddOwner,
            Arc::new(move |params: AddOwnerParams| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    let writer = signer.writer();
                    let transaction = writer.create_add_owner_transaction(params).await?;
                    writer.send(vec![transaction]).await
                })
            }),
        )
    }

    pub fn remove_owner(&self) -> Mutation<RemoveOwnerParams, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::RemoveOwner,
            Arc::new(move |params: RemoveOwnerParams| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    let writer = signer.writer();
                    let transaction = writer.create_remove_owner_transaction(params).await?;
                    writer.send(vec![transaction]).await
                })
            }),
        )
    }

    pub fn swap_owner(&self) -> Mutation<SwapOwnerParams, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::SwapOwner,
            Arc::new(move |params: SwapOwnerParams| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    let writer = signer.writer();
                    let transaction = writer.create_swap_owner_transaction(params).await?;
                    writer.send(vec![transaction]).await
                })
            }),
        )
    }

    pub fn change_threshold(&self) -> Mutation<usize, WriteResult> {
        let signer = self.signer.clone();
        self.mutation(
            WriteKind::ChangeThreshold,
            Arc::new(move |threshold: usize| {
                let signer = signer.clone();
                Box::pin(async move {
                    let signer = Self::require_signer(&signer)?;
                    let writer = signer.writer();
                    let transaction = writer
                        .create_change_threshold_transaction(threshold)
                        .await?;
                    writer.send(vec![transaction]).await
                })
            }),
        )
    }
}
