//! Integration tests for the write -> wait -> invalidate -> refetch cycle.
//!
//! These tests drive the engine end to end over a scripted client:
//! 1. Reads are cached and deduplicated across query derivations
//! 2. A settled write invalidates pending + account info + transactions
//! 3. An unsettled proposal only invalidates the pending list
//! 4. Signer attach/detach gates write availability

use std::sync::Arc;
use std::time::Duration;

use safe_sync::{FactKind, MutationStatus, SafeSync};
use safe_sync_client::testing::{MockHandleFactory, MockSafeClient};
use safe_sync_client::HandleFactory;
use safe_sync_types::{
    Address, ChainId, ConnectionTarget, EthereumTxHash, OperationBundleOptions, OperationHashes,
    SafeConfig, SafeOperationHash, SafeTxHash, SignerCredentials, TransactionInput,
    TransactionListEntry, UserOperationHash, WriteResult, WriteStatus,
};

const FAST: Duration = Duration::from_millis(1);

fn config() -> SafeConfig {
    SafeConfig {
        chain_id: ChainId(1),
        transport: "https://rpc.example".into(),
        provider: "https://svc.example".into(),
        signer: None,
        target: ConnectionTarget::Existing {
            safe_address: Address::from("0x5afe"),
        },
        operation_bundle_options: None,
    }
}

fn signed_config() -> SafeConfig {
    config().with_signer(SignerCredentials::new("0xkey"))
}

fn engine_over(client: &Arc<MockSafeClient>, config: SafeConfig) -> (SafeSync, Arc<MockHandleFactory>) {
    let factory = Arc::new(MockHandleFactory::new(Arc::clone(client)));
    let engine = SafeSync::with_ambient(
        Arc::clone(&factory) as Arc<dyn HandleFactory>,
        config,
    )
    .with_poll_interval(FAST);
    (engine, factory)
}

fn logged_facts(engine: &SafeSync) -> Vec<FactKind> {
    engine
        .cache()
        .invalidation_log()
        .into_iter()
        .map(|key| key.fact)
        .collect()
}

#[tokio::test]
async fn reads_are_deduplicated_across_query_derivations() {
    let client = MockSafeClient::new();
    client.script_account(Address::from("0x5afe"), 4, 2, true, vec![]);
    let (engine, factory) = engine_over(&client, config());

    let first = engine.queries(None).await.unwrap();
    assert_eq!(first.nonce().fetch().await.data, Some(4));

    let second = engine.queries(None).await.unwrap();
    assert_eq!(second.nonce().fetch().await.data, Some(4));

    // One network call, one handle construction, despite two derivations.
    assert_eq!(client.call_count("get_nonce"), 1);
    assert_eq!(factory.public_builds(), 1);
}

#[tokio::test]
async fn settled_write_refreshes_account_facts_and_history() {
    let client = MockSafeClient::new();
    client.script_account(Address::from("0x5afe"), 4, 2, true, vec![Address::from("0xa")]);
    let settlement = EthereumTxHash::from("0xeth");
    client.script_send_result(WriteResult::executed(
        Address::from("0x5afe"),
        settlement.clone(),
    ));
    client.script_transaction_list(vec![TransactionListEntry::EthereumTransaction {
        tx_hash: settlement,
        from: Address::from("0x5afe"),
    }]);
    let (engine, _factory) = engine_over(&client, signed_config());

    // Prime the nonce cache, then write.
    let queries = engine.queries(None).await.unwrap();
    let nonce = queries.nonce();
    assert_eq!(nonce.fetch().await.data, Some(4));

    // The write bumps the nonce on the service side.
    client.script_account(Address::from("0x5afe"), 5, 2, true, vec![Address::from("0xa")]);
    let send = engine.writes(None).await.unwrap().send_transaction();
    let result = send
        .invoke_async(vec![TransactionInput::new(Address::from("0xto"), "1", "0x")])
        .await
        .unwrap();
    assert!(result.transactions.unwrap().ethereum_tx_hash.is_some());

    // 1 pending + 6 expanded account facts + 1 transactions.
    let facts = logged_facts(&engine);
    assert_eq!(facts.len(), 8);
    assert_eq!(facts[0], FactKind::PendingTransactions);
    assert_eq!(facts[1], FactKind::SafeInfo);
    assert_eq!(*facts.last().unwrap(), FactKind::Transactions);

    // The primed nonce went stale; whether the subscription already
    // refetched it or this read does, the new value comes through.
    let refreshed = nonce.fetch().await;
    assert_eq!(refreshed.data, Some(5));
    assert!(client.call_count("get_nonce") >= 2);
}

#[tokio::test]
async fn unsettled_proposal_only_touches_the_pending_list() {
    let client = MockSafeClient::new();
    client.script_send_result(WriteResult::pending_signatures(
        Address::from("0x5afe"),
        SafeTxHash::from("0xsafe"),
    ));
    let (engine, _factory) = engine_over(&client, signed_config());

    let send = engine.writes(None).await.unwrap().send_transaction();
    send.invoke_async(vec![]).await.unwrap();

    assert_eq!(logged_facts(&engine), vec![FactKind::PendingTransactions]);
    // No settlement wait happened for a mere proposal.
    assert_eq!(client.call_count("wait_for_settlement"), 0);
}

#[tokio::test]
async fn confirm_write_runs_the_same_routing() {
    let client = MockSafeClient::new();
    let settlement = EthereumTxHash::from("0xeth");
    client.script_confirm_result(WriteResult::executed(
        Address::from("0x5afe"),
        settlement.clone(),
    ));
    client.script_transaction_list(vec![TransactionListEntry::EthereumTransaction {
        tx_hash: settlement,
        from: Address::from("0x5afe"),
    }]);
    let (engine, _factory) = engine_over(&client, signed_config());

    let confirm = engine.writes(None).await.unwrap().confirm_transaction();
    confirm
        .invoke_async(SafeTxHash::from("0xsafe"))
        .await
        .unwrap();

    assert_eq!(logged_facts(&engine).len(), 8);
    assert_eq!(client.call_count("wait_for_settlement"), 1);
}

#[tokio::test]
async fn signer_attach_detach_gates_writes() {
    let client = MockSafeClient::new();
    client.script_send_result(WriteResult::pending_signatures(
        Address::from("0x5afe"),
        SafeTxHash::from("0xsafe"),
    ));
    let (engine, factory) = engine_over(&client, config());

    // No signer yet: the write exists but rejects.
    let send = engine.writes(None).await.unwrap().send_transaction();
    let err = send.invoke_async(vec![]).await.unwrap_err();
    assert_eq!(format!("{err}"), "Signer client is not available");
    assert_eq!(send.status(), MutationStatus::Error);
    assert_eq!(factory.signer_builds(), 0);

    // Attach a signer; exactly one signer handle gets built.
    engine.connect(SignerCredentials::new("0xkey")).unwrap();
    let send = engine.writes(None).await.unwrap().send_transaction();
    send.invoke_async(vec![]).await.unwrap();
    assert_eq!(factory.signer_builds(), 1);

    // Re-deriving writes with an unchanged config reuses the handle.
    engine.writes(None).await.unwrap();
    assert_eq!(factory.signer_builds(), 1);

    // Detach; writes reject again.
    engine.disconnect().unwrap();
    let send = engine.writes(None).await.unwrap().send_transaction();
    assert!(send.invoke_async(vec![]).await.is_err());
}

#[tokio::test]
async fn operation_bundles_route_on_the_bundler_hash() {
    let client = MockSafeClient::new();
    client.script_operation_send_result(WriteResult {
        safe_address: Address::from("0x5afe"),
        status: WriteStatus::OperationSubmitted,
        transactions: None,
        operations: Some(OperationHashes {
            user_operation_hash: Some(UserOperationHash::from("0xuser")),
            safe_operation_hash: Some(SafeOperationHash::from("0xop")),
        }),
    });
    let mut cfg = signed_config();
    cfg.operation_bundle_options = Some(OperationBundleOptions {
        bundler_url: "https://bundler.example".into(),
        paymaster_url: None,
    });
    let (engine, _factory) = engine_over(&client, cfg);

    let send = engine.writes(None).await.unwrap().send_operation_bundle();
    send.invoke_async(vec![]).await.unwrap();

    // 1 operations list + 6 expanded account facts.
    let facts = logged_facts(&engine);
    assert_eq!(facts.len(), 7);
    assert_eq!(facts[0], FactKind::SafeOperations);
    assert_eq!(facts[1], FactKind::SafeInfo);
}

#[tokio::test]
async fn explicit_config_overrides_the_ambient_one() {
    let client = MockSafeClient::new();
    client.script_account(Address::from("0x5afe"), 4, 2, true, vec![]);
    let (engine, _factory) = engine_over(&client, config());

    let mut explicit = config();
    explicit.chain_id = ChainId(5);
    let queries = engine.queries(Some(explicit.clone())).await.unwrap();
    assert_eq!(queries.config(), &explicit);

    // Engine without ambient config fails to resolve.
    let bare = SafeSync::new(Arc::new(MockHandleFactory::new(MockSafeClient::new())));
    let err = bare.queries(None).await.err().unwrap();
    assert_eq!(
        format!("{err}"),
        "no Safe configuration provided and no ambient configuration is set"
    );
}
