//! Integration tests for the account-info aggregate over a live engine.

use std::sync::Arc;

use safe_sync::{QueryStatus, SafeSync};
use safe_sync_client::testing::{MockHandleFactory, MockSafeClient};
use safe_sync_client::HandleFactory;
use safe_sync_types::{Address, ChainId, ConnectionTarget, SafeConfig};

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

fn engine_over(client: &Arc<MockSafeClient>) -> SafeSync {
    let factory: Arc<dyn HandleFactory> =
        Arc::new(MockHandleFactory::new(Arc::clone(client)));
    SafeSync::with_ambient(factory, config())
}

#[tokio::test]
async fn fully_resolved_account_info() {
    let client = MockSafeClient::new();
    client.script_account(
        Address::from("0x5afe"),
        7,
        2,
        true,
        vec![Address::from("0xa"), Address::from("0xb")],
    );
    let engine = engine_over(&client);

    let info = engine.account_info(None).await.unwrap();
    assert_eq!(info.meta.status, QueryStatus::Success);
    assert!(info.meta.is_success && info.meta.is_fetched);

    let data = info.data.unwrap();
    assert_eq!(data.address, Some(Address::from("0x5afe")));
    assert_eq!(data.nonce, Some(7));
    assert_eq!(data.threshold, Some(2));
    assert_eq!(data.is_deployed, Some(true));
    assert_eq!(data.owners.unwrap().len(), 2);
}

#[tokio::test]
async fn one_failing_fact_degrades_the_aggregate_not_the_rest() {
    let client = MockSafeClient::new();
    client.script_account(Address::from("0x5afe"), 7, 2, true, vec![]);
    client.fail_next("get_threshold", "service unavailable");
    let engine = engine_over(&client);

    let info = engine.account_info(None).await.unwrap();
    assert_eq!(info.meta.status, QueryStatus::Error);
    assert_eq!(
        format!("{}", info.meta.error.unwrap()),
        "service unavailable"
    );

    // Partial data: everything but the failed fact resolved.
    let data = info.data.unwrap();
    assert_eq!(data.threshold, None);
    assert_eq!(data.address, Some(Address::from("0x5afe")));
    assert_eq!(data.nonce, Some(7));
    assert_eq!(data.is_deployed, Some(true));
    assert_eq!(data.owners, Some(vec![]));

    // The failed fact recovers on the next aggregate read.
    let retried = engine.account_info(None).await.unwrap();
    assert_eq!(retried.meta.status, QueryStatus::Success);
    assert_eq!(retried.data.unwrap().threshold, Some(2));
}

#[tokio::test]
async fn aggregate_reads_share_the_per_fact_cache() {
    let client = MockSafeClient::new();
    client.script_account(Address::from("0x5afe"), 7, 2, true, vec![]);
    let engine = engine_over(&client);

    engine.account_info(None).await.unwrap();
    engine.account_info(None).await.unwrap();

    // Five sub-reads total, not ten: the second aggregate hit the cache.
    assert_eq!(client.call_count("get_address"), 1);
    assert_eq!(client.call_count("get_nonce"), 1);
    assert_eq!(client.call_count("get_threshold"), 1);
    assert_eq!(client.call_count("is_deployed"), 1);
    assert_eq!(client.call_count("get_owners"), 1);
}

#[tokio::test]
async fn missing_handle_degrades_every_sub_read() {
    struct FailingFactory;

    #[async_trait::async_trait]
    impl HandleFactory for FailingFactory {
        async fn build_public(
            &self,
            _config: &SafeConfig,
        ) -> anyhow::Result<safe_sync_client::PublicHandle> {
            anyhow::bail!("transport unreachable")
        }

        async fn build_signer(
            &self,
            _config: &SafeConfig,
        ) -> anyhow::Result<safe_sync_client::SignerHandle> {
            anyhow::bail!("transport unreachable")
        }
    }

    let engine = SafeSync::with_ambient(Arc::new(FailingFactory), config());
    let info = engine.account_info(None).await.unwrap();

    assert_eq!(info.meta.status, QueryStatus::Error);
    assert_eq!(
        format!("{}", info.meta.error.unwrap()),
        "public client not initialized"
    );
    // Composite data is the (empty) partial record, never withheld.
    assert_eq!(info.data.unwrap(), safe_sync::AccountInfo::default());
}
