use lendfolio::datasource::MockDataSource;
use lendfolio::orchestration::{OptimisticOutcome, PositionAggregator, PORTFOLIO_LOAD_ERROR};
use lendfolio::{Address, Decimal, Pool, PoolId, PoolStatus, SystemClock, TxId, WalletSession};
use std::sync::Arc;
use std::time::Duration;

fn addr(s: &str) -> Address {
    Address::new(s.to_string())
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn pool(id: &str, contract: &str) -> Pool {
    Pool {
        id: PoolId::new(id.to_string()),
        name: format!("Pool {}", id),
        contract_address: addr(contract),
        status: PoolStatus::Active,
        apy: d("12.5"),
        metadata: serde_json::Value::Null,
    }
}

fn wallet() -> Address {
    addr("0xwallet")
}

async fn connected(mock: Arc<MockDataSource>) -> PositionAggregator {
    let session = WalletSession::in_memory(Arc::new(SystemClock));
    session.connect(wallet()).await.unwrap();
    PositionAggregator::new(mock, session)
}

/// Pool A holds nothing, pool B holds 10 LP worth 50, pool C errors.
fn three_pool_mock() -> MockDataSource {
    MockDataSource::new()
        .with_pools(vec![pool("a", "0xa"), pool("b", "0xb"), pool("c", "0xc")])
        .with_balance(&wallet(), &addr("0xa"), d("0"))
        .with_balance(&wallet(), &addr("0xb"), d("10"))
        .with_redeem_value(&addr("0xb"), d("50"))
        .with_failing_balance(&addr("0xc"))
}

#[tokio::test]
async fn test_failing_pool_is_isolated() {
    let agg = connected(Arc::new(three_pool_mock())).await;

    let view = agg.load().await;

    assert_eq!(view.error, None);
    assert!(!view.loading);
    assert!(view.has_positions);
    assert_eq!(view.snapshot.positions.len(), 1);
    let b = &view.snapshot.positions[0];
    assert_eq!(b.pool_id.as_str(), "b");
    assert_eq!(b.balance, d("10"));
    assert_eq!(b.current_value, d("50"));
    assert_eq!(view.snapshot.total_value, d("50"));
}

#[tokio::test]
async fn test_optimistic_update_changes_balance_only() {
    let agg = connected(Arc::new(three_pool_mock())).await;
    agg.load().await;

    let outcome = agg
        .update_position_optimistically(&PoolId::new("b".into()), d("5"), TxId::new("tx-1".into()))
        .await;
    assert_eq!(outcome, OptimisticOutcome::Applied);

    let view = agg.view().await;
    let b = view.snapshot.position(&PoolId::new("b".into())).unwrap();
    assert_eq!(b.balance, d("15"));
    assert_eq!(b.current_value, d("50"));
    assert_eq!(view.snapshot.total_value, d("50"));
}

#[tokio::test]
async fn test_repeated_tx_id_applies_once() {
    let agg = connected(Arc::new(three_pool_mock())).await;
    agg.load().await;
    let b = PoolId::new("b".into());

    let first = agg
        .update_position_optimistically(&b, d("5"), TxId::new("tx-1".into()))
        .await;
    let second = agg
        .update_position_optimistically(&b, d("5"), TxId::new("tx-1".into()))
        .await;

    assert_eq!(first, OptimisticOutcome::Applied);
    assert_eq!(second, OptimisticOutcome::Duplicate);
    assert_eq!(agg.view().await.snapshot.position(&b).unwrap().balance, d("15"));
}

#[tokio::test]
async fn test_refresh_after_confirmation_does_not_double_count() {
    let mock = Arc::new(three_pool_mock());
    let agg = connected(mock.clone()).await;
    agg.load().await;
    let b = PoolId::new("b".into());

    agg.update_position_optimistically(&b, d("5"), TxId::new("deposit".into()))
        .await;
    mock.set_balance(&wallet(), &addr("0xb"), d("15")).await;
    mock.set_redeem_value(&addr("0xb"), d("75")).await;

    let view = agg.refresh().await;
    let position = view.snapshot.position(&b).unwrap();
    assert_eq!(position.balance, d("15"));
    assert_eq!(position.current_value, d("75"));
    assert_eq!(agg.refresh_count(), 1);
}

#[tokio::test]
async fn test_stale_batch_is_discarded() {
    let mock = Arc::new(
        MockDataSource::new()
            .with_pool(pool("b", "0xb"))
            .with_balance(&wallet(), &addr("0xb"), d("10"))
            .with_redeem_value(&addr("0xb"), d("50"))
            .with_balance_delay(Duration::from_millis(300)),
    );
    let agg = Arc::new(connected(mock.clone()).await);

    let slow = {
        let agg = agg.clone();
        tokio::spawn(async move { agg.load().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    mock.set_balance(&wallet(), &addr("0xb"), d("20")).await;
    mock.set_redeem_value(&addr("0xb"), d("100")).await;
    let fresh = agg.refresh().await;
    assert_eq!(fresh.generation, 2);

    slow.await.unwrap();

    let view = agg.view().await;
    assert_eq!(view.generation, 2);
    let b = view.snapshot.position(&PoolId::new("b".into())).unwrap();
    assert_eq!(b.balance, d("20"));
    assert_eq!(b.current_value, d("100"));
}

#[tokio::test]
async fn test_update_during_in_flight_batch_survives_that_batch_only() {
    let mock = Arc::new(
        MockDataSource::new()
            .with_pool(pool("b", "0xb"))
            .with_balance(&wallet(), &addr("0xb"), d("10"))
            .with_redeem_value(&addr("0xb"), d("50"))
            .with_balance_delay(Duration::ZERO)
            .with_balance_delay(Duration::from_millis(200)),
    );
    let agg = Arc::new(connected(mock.clone()).await);
    let b = PoolId::new("b".into());
    assert_eq!(agg.load().await.generation, 1);

    let in_flight = {
        let agg = agg.clone();
        tokio::spawn(async move { agg.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let outcome = agg
        .update_position_optimistically(&b, d("5"), TxId::new("tx-pending".into()))
        .await;
    assert_eq!(outcome, OptimisticOutcome::Applied);

    // The batch read the balance before the deposit, so the delta is re-applied.
    let view = in_flight.await.unwrap();
    assert_eq!(view.generation, 2);
    assert_eq!(view.snapshot.position(&b).unwrap().balance, d("15"));

    // A batch issued after the delta is authoritative and drops it.
    let view = agg.refresh().await;
    assert_eq!(view.generation, 3);
    assert_eq!(view.snapshot.position(&b).unwrap().balance, d("10"));
}

#[tokio::test]
async fn test_registry_failure_empties_portfolio_then_recovers() {
    let mock = Arc::new(three_pool_mock());
    let agg = connected(mock.clone()).await;
    assert!(agg.load().await.has_positions);

    mock.set_pool_registry_failing(true).await;
    let failed = agg.refresh().await;
    assert!(!failed.has_positions);
    assert!(failed.snapshot.total_value.is_zero());
    assert_eq!(failed.error.as_deref(), Some(PORTFOLIO_LOAD_ERROR));

    mock.set_pool_registry_failing(false).await;
    let recovered = agg.refresh().await;
    assert_eq!(recovered.error, None);
    assert_eq!(recovered.snapshot.total_value, d("50"));
}

#[tokio::test]
async fn test_disconnect_clears_portfolio() {
    let agg = connected(Arc::new(three_pool_mock())).await;
    assert!(agg.load().await.has_positions);

    agg.session().disconnect().await.unwrap();
    let view = agg.load().await;

    assert!(!view.has_positions);
    assert_eq!(view.error, None);
}
