//! Mock connectors for candela tests and demos.
//!
//! - [`MockConnector`] serves deterministic fixture candles and replays a
//!   scripted live session.
//! - [`DynamicMockConnector`] defers every call to a
//!   [`DynamicMockController`] so tests can script failures, stalls and
//!   manual pushes.
use std::time::Duration;

use async_trait::async_trait;
use candela_core::connector::{CandelaConnector, CandleStreamProvider, HistoryProvider};
use candela_core::stream::StreamHandle;
use candela_core::{CandelaError, Candle, CandleUpdate, SnapshotRequest, StreamRequest, Symbol};
use tokio::sync::{mpsc, oneshot};

mod dynamic;
pub mod fixtures;

pub use dynamic::{DynamicMockConnector, DynamicMockController, MockBehavior, StreamBehavior};

/// Mock connector for CI-safe examples. Provides deterministic data from static fixtures.
///
/// The symbols `FAIL` and `SLOW` are special: the former fails every call,
/// the latter answers snapshots after a short delay.
pub struct MockConnector {
    pace: Duration,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Snapshot latency of the `SLOW` symbol.
    pub const SLOW_DELAY: Duration = Duration::from_millis(200);

    /// Default delay between scripted live updates.
    pub const DEFAULT_PACE: Duration = Duration::from_millis(250);

    /// Connector replaying updates at [`DEFAULT_PACE`](Self::DEFAULT_PACE).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pace: Self::DEFAULT_PACE,
        }
    }

    /// Change the delay between scripted live updates.
    #[must_use]
    pub const fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    fn maybe_fail(symbol: &str, capability: &'static str) -> Option<CandelaError> {
        (symbol == "FAIL").then(|| {
            CandelaError::connector("candela-mock", format!("forced failure: {capability}"))
        })
    }
}

impl CandelaConnector for MockConnector {
    fn name(&self) -> &'static str {
        "candela-mock"
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        Some(self as &dyn HistoryProvider)
    }

    fn as_stream_provider(&self) -> Option<&dyn CandleStreamProvider> {
        Some(self as &dyn CandleStreamProvider)
    }
}

#[async_trait]
impl HistoryProvider for MockConnector {
    async fn snapshot(&self, req: &SnapshotRequest) -> Result<Vec<Candle>, CandelaError> {
        if let Some(err) = Self::maybe_fail(req.symbol.as_str(), "snapshot") {
            return Err(err);
        }
        let fixture = if req.symbol.as_str() == "SLOW" {
            // Simulated latency; serves AAPL data under the requested name.
            tokio::time::sleep(Self::SLOW_DELAY).await;
            Symbol::new("AAPL")?
        } else {
            req.symbol.clone()
        };
        fixtures::candles::snapshot(&fixture, req.interval, req.limit)
            .ok_or_else(|| CandelaError::not_found(format!("snapshot for {}", req.symbol)))
    }
}

#[async_trait]
impl CandleStreamProvider for MockConnector {
    async fn stream_candles(
        &self,
        req: &StreamRequest,
    ) -> Result<(StreamHandle, mpsc::Receiver<CandleUpdate>), CandelaError> {
        if let Some(err) = Self::maybe_fail(req.symbol.as_str(), "stream_candles") {
            return Err(err);
        }
        let updates = fixtures::candles::live_updates(&req.symbol, req.interval);
        if updates.is_empty() {
            return Err(CandelaError::not_found(format!("stream for {}", req.symbol)));
        }

        let pace = self.pace;
        let (tx, rx) = mpsc::channel::<CandleUpdate>(64);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            for update in updates {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => return,
                    () = tokio::time::sleep(pace) => {}
                }
                if tx.send(update).await.is_err() {
                    return;
                }
            }
            // Script exhausted: dropping the sender ends the session.
        });
        Ok((StreamHandle::new(join, stop_tx), rx))
    }
}
