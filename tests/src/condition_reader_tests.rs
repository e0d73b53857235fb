//! Claim condition reads and NFT metadata through the mock Trail API.

use alloy_primitives::{Address, U256};
use anyhow::Result;
use axum::http::StatusCode;
use drop_claimer::condition::DropStatus;
use drop_claimer::Error;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::utils::{
    condition_fields, harness, MockSigner, Reply, APP_ID, CONDITION_NODE, MAX_UINT256,
    PRIMARY_NODE, TX_HASH, USDC_NODE, WALLET,
};

const NOW: u64 = 1_750_000_000;

// ── Condition ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_free_unlimited_drop_view() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;

    let snapshot = h.state.conditions.reader().read(None).await?;
    let view = snapshot.view(NOW);

    assert_eq!(view.price, "FREE");
    assert_eq!(view.max_supply, "∞");
    assert_eq!(view.remaining, "∞");
    assert_eq!(view.claimed, "3");
    assert_eq!(view.progress_bps, None);
    assert_eq!(view.status, DropStatus::Open);
    assert!(view.claimable);
    assert!(view.message.is_none());
    assert!(snapshot.metadata.is_none());
    Ok(())
}

#[tokio::test]
async fn test_limited_paid_drop_view() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    h.mock
        .set_condition(condition_fields("1500000", "100", "25", None));

    let view = h.state.conditions.reader().read(None).await?.view(NOW);

    assert_eq!(view.price, "1.5 USDC");
    assert_eq!(view.price_raw, "1500000");
    assert_eq!(view.remaining, "75");
    assert_eq!(view.progress_bps, Some(2_500));
    Ok(())
}

#[tokio::test]
async fn test_zero_max_supply_is_not_configured() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    h.mock.set_condition(condition_fields("0", "0", "0", None));

    let view = h.state.conditions.reader().read(None).await?.view(NOW);

    assert_eq!(view.status, DropStatus::NotConfigured);
    assert!(!view.claimable);
    assert!(view
        .message
        .as_deref()
        .is_some_and(|m| m.contains("not currently configured")));
    Ok(())
}

#[tokio::test]
async fn test_missing_output_reads_as_all_zero() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    h.mock.set_condition(Value::Null);

    let snapshot = h.state.conditions.reader().read(None).await?;

    assert!(!snapshot.condition.is_configured());
    assert!(snapshot.condition.price_per_token.is_zero());
    assert!(snapshot.condition.metadata_uri.is_none());
    Ok(())
}

#[tokio::test]
async fn test_field_order_does_not_matter() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    h.mock.set_condition(json!([
        {"name": "supplyClaimed", "value": "9"},
        {"name": "pricePerToken", "value": 250000},
        {"name": "maxClaimableSupply", "value": "10"}
    ]));

    let condition = h.state.conditions.reader().read(None).await?.condition;

    assert_eq!(condition.supply_claimed, U256::from(9u64));
    assert_eq!(condition.price_per_token, U256::from(250_000u64));
    assert_eq!(condition.remaining().to_string(), "1");
    assert_eq!(condition.start_timestamp, 0);
    Ok(())
}

#[tokio::test]
async fn test_read_request_shape() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;

    h.state.conditions.reader().read(None).await?;
    let wallet = Address::from_str(WALLET)?;
    h.state.conditions.reader().read(Some(wallet)).await?;

    let reads = h.mock.calls("read");
    assert_eq!(reads.len(), 2);
    assert_eq!(reads[0].target, CONDITION_NODE);
    assert_eq!(reads[0].app_id.as_deref(), Some(APP_ID));
    assert_eq!(
        reads[0].body["walletAddress"],
        "0x0000000000000000000000000000000000000000"
    );
    assert_eq!(reads[0].body["execution"], json!({"type": "latest"}));
    let inputs = &reads[0].body["userInputs"];
    assert_eq!(inputs[PRIMARY_NODE]["inputs._tokenId"]["value"], "0");
    assert_eq!(inputs[CONDITION_NODE]["inputs._tokenId"]["value"], "0");
    assert_eq!(inputs[CONDITION_NODE]["inputs._conditionId"]["value"], "0");
    assert_eq!(reads[1].body["walletAddress"], WALLET);
    Ok(())
}

#[tokio::test]
async fn test_repeated_reads_are_identical() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    let reader = h.state.conditions.reader();

    let first = reader.read(None).await?;
    let second = reader.read(None).await?;

    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_read_failure_is_a_read_error() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    *h.mock.read_failure.lock().unwrap() =
        Some(Reply::error(StatusCode::SERVICE_UNAVAILABLE, "node offline"));

    let err = h.state.conditions.reader().read(None).await.unwrap_err();

    match err {
        Error::Read(message) => assert_eq!(message, "node offline"),
        other => panic!("expected read error, got {other:?}"),
    }
    assert!(h.state.conditions.latest().is_none());
    Ok(())
}

// ── Metadata ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_metadata_and_image_are_fetched_through_gateway() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    h.mock.ipfs.lock().unwrap().insert(
        "Qm123/meta.json".into(),
        json!({"name": "Herd Pass", "image": "ipfs://Qm456/img.png"}),
    );
    h.mock.set_condition(condition_fields(
        "0",
        MAX_UINT256,
        "0",
        Some("ipfs://Qm123/meta.json"),
    ));

    let snapshot = h.state.conditions.reader().read(None).await?;

    let metadata = snapshot.metadata.expect("metadata fetched");
    assert_eq!(metadata.name.as_deref(), Some("Herd Pass"));
    assert_eq!(
        metadata.image,
        Some(format!("http://{}/ipfs/Qm456/img.png", h.addr))
    );
    let fetches = h.mock.calls("ipfs");
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].target, "Qm123/meta.json");
    Ok(())
}

#[tokio::test]
async fn test_metadata_failure_keeps_condition() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    h.mock.set_condition(condition_fields(
        "0",
        "50",
        "1",
        Some("ipfs://QmMissing/meta.json"),
    ));

    let snapshot = h.state.conditions.reader().read(None).await?;

    assert!(snapshot.metadata.is_none());
    assert_eq!(
        snapshot.condition.metadata_uri.as_deref(),
        Some("ipfs://QmMissing/meta.json")
    );
    assert_eq!(snapshot.view(NOW).remaining, "49");
    Ok(())
}

// ── Store and balance ───────────────────────────────────────────────

#[tokio::test]
async fn test_store_caches_first_read() -> Result<()> {
    let h = harness(Some(WALLET), MockSigner::returning(TX_HASH)).await?;

    let first = h.state.conditions.current().await?;
    let cached = h.state.conditions.current().await?;

    assert_eq!(first, cached);
    assert_eq!(h.mock.calls("read").len(), 1);
    assert_eq!(h.mock.calls("read")[0].body["walletAddress"], WALLET);
    Ok(())
}

#[tokio::test]
async fn test_usdc_balance_read() -> Result<()> {
    let h = harness(Some(WALLET), MockSigner::returning(TX_HASH)).await?;
    *h.mock.usdc_balance.lock().unwrap() = "2500000".into();

    let balance = h
        .state
        .conditions
        .reader()
        .read_usdc_balance(Address::from_str(WALLET)?)
        .await?;

    assert_eq!(balance, U256::from(2_500_000u64));
    let reads = h.mock.calls("read");
    assert_eq!(reads[0].target, USDC_NODE);
    assert_eq!(
        reads[0].body["userInputs"][USDC_NODE]["inputs.account"]["value"],
        WALLET
    );
    Ok(())
}

#[tokio::test]
async fn test_wallet_change_triggers_re_read() -> Result<()> {
    let h = harness(None, MockSigner::returning(TX_HASH)).await?;
    let mut snapshots = h.state.conditions.subscribe();
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(Arc::clone(&h.state.conditions).run_session_watch(cancel.clone()));

    snapshots.wait_for(Option::is_some).await?;
    assert_eq!(h.mock.calls("read").len(), 1);

    h.state.session.sign_in(Address::from_str(WALLET)?);

    let mut reads = Vec::new();
    for _ in 0..50 {
        reads = h.mock.calls("read");
        if reads.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(reads.len(), 2, "sign-in should re-read the condition once");
    assert_eq!(
        reads[0].body["walletAddress"],
        "0x0000000000000000000000000000000000000000"
    );
    assert_eq!(reads[1].body["walletAddress"], WALLET);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), watcher).await??;
    Ok(())
}
