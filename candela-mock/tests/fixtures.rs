use std::time::Duration;

use candela_core::{CandelaError, Interval, SnapshotRequest, Symbol};
use candela_mock::MockConnector;
use candela_mock::fixtures::candles;
use candela_core::connector::CandelaConnector;

fn req(symbol: &str, limit: usize) -> SnapshotRequest {
    SnapshotRequest::new(Symbol::new(symbol).unwrap(), Interval::I5m, limit).unwrap()
}

#[tokio::test]
async fn snapshot_returns_the_most_recent_periods() {
    let mock = MockConnector::new();
    let hp = mock.as_history_provider().expect("history provider");

    let last_ten = hp.snapshot(&req("AAPL", 10)).await.expect("snapshot ok");
    assert_eq!(last_ten.len(), 10);
    assert!(last_ten.windows(2).all(|w| w[1].ts - w[0].ts == chrono::Duration::minutes(5)));

    let all = candles::history(&Symbol::new("AAPL").unwrap(), Interval::I5m).unwrap();
    assert_eq!(all.len(), candles::HISTORY_LEN);
    assert_eq!(last_ten[..], all[all.len() - 10..]);

    let oversized = hp.snapshot(&req("AAPL", 10_000)).await.expect("snapshot ok");
    assert_eq!(oversized.len(), candles::HISTORY_LEN);
}

#[tokio::test]
async fn special_symbols() {
    let mock = MockConnector::new();
    let hp = mock.as_history_provider().expect("history provider");
    assert!(matches!(
        hp.snapshot(&req("FAIL", 5)).await,
        Err(CandelaError::Connector { .. })
    ));
    assert!(matches!(
        hp.snapshot(&req("NOPE", 5)).await,
        Err(CandelaError::NotFound { .. })
    ));
}

#[test]
fn live_script_revises_then_rolls() {
    let symbol = Symbol::new("MSFT").unwrap();
    let history = candles::history(&symbol, Interval::I1m).unwrap();
    let updates = candles::live_updates(&symbol, Interval::I1m);
    assert_eq!(updates.len(), candles::LIVE_PERIODS * candles::TICKS_PER_PERIOD);

    let last = history.last().unwrap();
    assert_eq!(updates[0].candle.ts, last.ts);
    let next = &updates[candles::TICKS_PER_PERIOD];
    assert_eq!(next.candle.ts, last.ts + chrono::Duration::minutes(1));
    assert!(updates[candles::TICKS_PER_PERIOD - 1].is_final);
    assert!(!updates[0].is_final);
}

#[tokio::test(start_paused = true)]
async fn stream_replays_script_then_ends() {
    let mock = MockConnector::new().with_pace(Duration::from_millis(10));
    let sp = mock.as_stream_provider().expect("stream provider");
    let (_handle, mut rx) = sp
        .stream_candles(&req("TSLA", 1).stream_request())
        .await
        .expect("stream ok");

    let mut got = Vec::new();
    while let Some(u) = rx.recv().await {
        got.push(u);
    }
    let expected = candles::live_updates(&Symbol::new("TSLA").unwrap(), Interval::I5m);
    assert_eq!(got, expected);
}
