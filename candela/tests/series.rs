mod helpers;

use std::sync::Arc;
use std::time::Duration;

use candela::{Candela, CandelaError, FeedStatus, Interval, Observable};
use candela_mock::fixtures::candles as fixtures;
use candela_mock::{DynamicMockConnector, MockBehavior, MockConnector, StreamBehavior};
use helpers::{AAPL, MSFT, candle, settle, snapshot_req, sym, update};
use tokio::task::LocalSet;

#[tokio::test(start_paused = true)]
async fn mock_session_seeds_revises_and_rolls() {
    LocalSet::new()
        .run_until(async {
            let mock = MockConnector::new().with_pace(Duration::from_millis(10));
            let candela = Candela::builder()
                .with_connector(Arc::new(mock))
                .snapshot_limit(5)
                .build()
                .expect("build");

            let mut series = candela.candles_for(sym(AAPL), Interval::I1m).expect("series");
            settle().await;

            let history = fixtures::history(&sym(AAPL), Interval::I1m).expect("fixture");
            let live = fixtures::live_updates(&sym(AAPL), Interval::I1m);
            assert_eq!(series.capacity(), Some(5));
            assert_eq!(series.candles().get(), history[history.len() - 5..].to_vec());

            tokio::time::sleep(Duration::from_millis(500)).await;
            assert_eq!(series.feed_status().get(), FeedStatus::Ended);

            let per = fixtures::TICKS_PER_PERIOD;
            let expected = vec![
                history[history.len() - 3].clone(),
                history[history.len() - 2].clone(),
                live[per - 1].candle.clone(),
                live[2 * per - 1].candle.clone(),
                live[3 * per - 1].candle.clone(),
            ];
            assert_eq!(series.candles().get(), expected);
            assert_eq!(series.last_closed().get(), Some(live[2 * per - 1].candle.clone()));

            series.close().await;
            assert!(series.is_closed());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn manual_stream_drives_window_and_close_freezes_it() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller
                .set_snapshot_behavior(sym(AAPL), MockBehavior::Return(vec![candle(1, 1), candle(2, 2), candle(3, 3)]))
                .await;
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let candela = Candela::builder().with_connector(mock).build().expect("build");

            let mut series = candela.candles(snapshot_req(AAPL, 3)).expect("series");
            settle().await;
            assert_eq!(series.feed_status().get(), FeedStatus::Live);
            assert_eq!(series.last_closed().get(), Some(candle(2, 2)));

            controller.push_update("P0", update(AAPL, 3, 4)).await;
            settle().await;
            assert_eq!(series.candles().get(), vec![candle(1, 1), candle(2, 2), candle(3, 4)]);

            controller.push_update("P0", update(AAPL, 4, 5)).await;
            settle().await;
            assert_eq!(series.candles().get(), vec![candle(2, 2), candle(3, 4), candle(4, 5)]);
            assert_eq!(series.last_closed().get(), Some(candle(3, 4)));

            series.close().await;
            series.close().await;
            assert!(!controller.push_update("P0", update(AAPL, 5, 6)).await);
            assert_eq!(series.candles().get(), vec![candle(2, 2), candle(3, 4), candle(4, 5)]);
            assert_eq!(series.feed_status().get(), FeedStatus::Ended);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn refetch_recovers_from_a_failed_snapshot() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller
                .set_snapshot_behavior(sym(AAPL), MockBehavior::Fail(CandelaError::Other("503".into())))
                .await;
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let candela = Candela::builder().with_connector(mock).build().expect("build");

            let series = candela.candles(snapshot_req(AAPL, 2)).expect("series");
            settle().await;
            let state = series.snapshot_state().get();
            assert!(state.is_failed());
            assert!(matches!(state.error, Some(CandelaError::Connector { .. })));

            // Live updates before seeding are ignored.
            controller.push_update("P0", update(AAPL, 9, 9)).await;
            settle().await;
            assert!(series.candles().get().is_empty());

            controller
                .set_snapshot_behavior(sym(AAPL), MockBehavior::Return(vec![candle(1, 1), candle(2, 2)]))
                .await;
            series.refetch();
            assert!(series.snapshot_state().get().is_loading());
            settle().await;
            assert_eq!(series.candles().get(), vec![candle(1, 1), candle(2, 2)]);
            assert_eq!(series.capacity(), Some(2));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_resource_keeps_only_the_latest_request() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller
                .set_snapshot_behavior(sym(AAPL), MockBehavior::Delay(Duration::from_millis(100), vec![candle(1, 1)]))
                .await;
            controller
                .set_snapshot_behavior(sym(MSFT), MockBehavior::Delay(Duration::from_millis(10), vec![candle(2, 2)]))
                .await;
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let candela = Candela::builder().with_connector(mock).build().expect("build");

            let request = Observable::new(None);
            let resource = candela.snapshot_resource(&request).expect("resource");
            assert!(resource.state().get().is_idle());

            request.set(Some(snapshot_req(AAPL, 1)));
            request.set(Some(snapshot_req(MSFT, 1)));
            tokio::time::sleep(Duration::from_millis(200)).await;

            assert_eq!(resource.data().get(), Some(vec![candle(2, 2)]));
            // The superseded request was cancelled before reaching the connector.
            assert_eq!(controller.get_snapshot_requests().await, vec![snapshot_req(MSFT, 1)]);

            request.set(None);
            assert!(resource.state().get().is_idle());
        })
        .await;
}
