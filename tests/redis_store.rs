use std::env;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use woo_klaviyo_bridge::idempotency::{IdempotencyGuard, RedisStore};
use woo_klaviyo_bridge::webhook_models::OrderId;

/// Integration smoke test for the Redis-backed idempotency guard.
/// Marked ignored so it never runs without a server; set TEST_REDIS_URL to run.
#[tokio::test]
#[ignore]
async fn redis_guard_round_trip_smoke_test() -> anyhow::Result<()> {
    let redis_url = env::var("TEST_REDIS_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_REDIS_URL to run this test"))?;

    let store = RedisStore::connect(&redis_url)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let guard = IdempotencyGuard::new(Arc::new(store), Duration::from_secs(60));

    // Unique id to avoid collisions on repeated runs
    let order_id = OrderId(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as i64);

    assert!(!guard.has_been_processed(order_id).await?);

    guard
        .mark_processed_for(order_id, Duration::from_millis(500))
        .await?;
    assert!(guard.has_been_processed(order_id).await?);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(!guard.has_been_processed(order_id).await?);

    Ok(())
}
