mod helpers;

use std::time::Duration;

use candela::{CandelaError, FeedConfig, FeedStatus, Interval, LiveFeed, StreamRequest};
use candela_mock::{DynamicMockConnector, StreamBehavior};
use helpers::{AAPL, MSFT, candle, settle, sym, update};
use tokio::task::LocalSet;

fn aapl_1m() -> StreamRequest {
    StreamRequest {
        symbol: sym(AAPL),
        interval: Interval::I1m,
    }
}

#[tokio::test(start_paused = true)]
async fn pumps_updates_into_the_live_cell() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;

            let mut feed = LiveFeed::start(mock, aapl_1m(), FeedConfig::default()).expect("feed");
            assert_eq!(feed.status().get(), FeedStatus::Connecting);
            settle().await;
            assert_eq!(feed.status().get(), FeedStatus::Live);
            assert_eq!(feed.latest().get(), None);

            assert!(controller.push_update("P0", update(AAPL, 1, 10)).await);
            settle().await;
            assert_eq!(feed.latest().get(), Some(candle(1, 10)));

            assert!(controller.push_update("P0", update(AAPL, 1, 11)).await);
            settle().await;
            assert_eq!(feed.latest().get(), Some(candle(1, 11)));

            feed.stop().await;
            assert_eq!(feed.status().get(), FeedStatus::Ended);
            assert_eq!(controller.get_stream_requests("P0").await, vec![aapl_1m()]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn repeated_update_still_notifies() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let feed = LiveFeed::start(mock, aapl_1m(), FeedConfig::default()).expect("feed");
            settle().await;

            assert!(controller.push_update("P0", update(AAPL, 1, 10)).await);
            settle().await;
            let version = feed.latest().version();

            assert!(controller.push_update("P0", update(AAPL, 1, 10)).await);
            settle().await;
            assert_eq!(feed.latest().get(), Some(candle(1, 10)));
            assert_eq!(feed.latest().version(), version + 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn foreign_symbol_fails_the_feed() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let feed = LiveFeed::start(mock, aapl_1m(), FeedConfig::default()).expect("feed");
            settle().await;

            assert!(controller.push_update("P0", update(AAPL, 1, 10)).await);
            assert!(controller.push_update("P0", update(MSFT, 1, 99)).await);
            settle().await;

            assert!(matches!(
                feed.status().get(),
                FeedStatus::Failed(CandelaError::Invariant(_))
            ));
            assert_eq!(feed.latest().get(), Some(candle(1, 10)));

            // The transport was unsubscribed; nothing flows any more.
            assert!(!controller.push_update("P0", update(AAPL, 2, 12)).await);
            settle().await;
            assert_eq!(feed.latest().get(), Some(candle(1, 10)));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn foreign_interval_fails_the_feed() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let feed = LiveFeed::start(mock, aapl_1m(), FeedConfig::default()).expect("feed");
            settle().await;

            let mut wrong = update(AAPL, 1, 10);
            wrong.interval = Interval::I5m;
            assert!(controller.push_update("P0", wrong).await);
            settle().await;

            assert!(matches!(
                feed.status().get(),
                FeedStatus::Failed(CandelaError::Invariant(_))
            ));
            assert_eq!(feed.latest().get(), None);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn subscription_failure_and_transport_close() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            let denied = CandelaError::connector("P0", "denied");
            controller
                .set_stream_behavior("P0", StreamBehavior::Fail(denied.clone()))
                .await;
            let feed = LiveFeed::start(mock.clone(), aapl_1m(), FeedConfig::default()).expect("feed");
            settle().await;
            assert_eq!(feed.status().get(), FeedStatus::Failed(denied));

            controller.set_stream_behavior("P0", StreamBehavior::Manual).await;
            let feed = LiveFeed::start(mock, aapl_1m(), FeedConfig::default()).expect("feed");
            settle().await;
            controller.fail_stream("P0").await;
            settle().await;
            assert_eq!(feed.status().get(), FeedStatus::Ended);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn stop_during_a_stalled_connect_is_prompt_and_idempotent() {
    LocalSet::new()
        .run_until(async {
            let (mock, controller) = DynamicMockConnector::new_with_controller("P0");
            controller.set_stream_behavior("P0", StreamBehavior::Hang).await;
            let cfg = FeedConfig {
                stop_timeout: Duration::from_millis(50),
            };
            let mut feed = LiveFeed::start(mock, aapl_1m(), cfg).expect("feed");
            settle().await;
            assert_eq!(feed.status().get(), FeedStatus::Connecting);

            let started = tokio::time::Instant::now();
            feed.stop().await;
            assert!(started.elapsed() < Duration::from_millis(50));
            assert!(feed.is_stopped());
            assert_eq!(feed.status().get(), FeedStatus::Ended);

            feed.stop().await;
            assert_eq!(feed.status().get(), FeedStatus::Ended);
        })
        .await;
}

#[tokio::test]
async fn connector_without_streaming_is_rejected() {
    LocalSet::new()
        .run_until(async {
            struct Silent;
            impl candela::CandelaConnector for Silent {
                fn name(&self) -> &'static str {
                    "silent"
                }
            }
            let err = LiveFeed::start(std::sync::Arc::new(Silent), aapl_1m(), FeedConfig::default())
                .err()
                .expect("must fail");
            assert_eq!(err, CandelaError::unsupported("stream_candles"));
        })
        .await;
}
