use std::sync::Arc;

use candela_core::connector::CandelaConnector;
use candela_core::reactive::Observable;
use candela_core::stream::{StreamHandle, drop_impl};
use candela_core::{CandelaError, Candle, CandleUpdate, FeedConfig, StreamRequest};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Lifecycle of a [`LiveFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// Waiting for the connector to accept the subscription.
    Connecting,
    /// Subscribed; updates flow into the live cell.
    Live,
    /// The transport closed the stream or the feed was stopped.
    Ended,
    /// The subscription failed or the transport broke an invariant.
    Failed(CandelaError),
}

impl FeedStatus {
    /// `true` once the feed will never deliver another update.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed(_))
    }
}

/// Live candle cell fed by a connector stream.
///
/// Behavior and trade-offs:
/// - The pump runs on [`tokio::task::spawn_local`]; create the feed inside a
///   [`tokio::task::LocalSet`].
/// - Updates are forwarded as-is, and every update notifies even when it
///   repeats the previous candle; merging into a window is the consumer's job.
/// - A symbol or interval mismatch is treated as a broken transport: the feed
///   unsubscribes and reports `Failed(Invariant)` instead of guessing.
/// - Dropping the feed sends a best-effort stop and aborts the pump.
pub struct LiveFeed {
    request: StreamRequest,
    latest: Observable<Option<Candle>>,
    status: Observable<FeedStatus>,
    cfg: FeedConfig,
    join: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl LiveFeed {
    /// Subscribe to `request` through `connector`.
    ///
    /// # Errors
    /// Returns `Unsupported` if the connector cannot stream candles.
    ///
    /// # Panics
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn start(
        connector: Arc<dyn CandelaConnector>,
        request: StreamRequest,
        cfg: FeedConfig,
    ) -> Result<Self, CandelaError> {
        if connector.as_stream_provider().is_none() {
            return Err(CandelaError::unsupported("stream_candles"));
        }

        let latest = Observable::new(None);
        let status = Observable::new(FeedStatus::Connecting);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            connector = connector.name(),
            symbol = %request.symbol,
            interval = %request.interval,
            "starting live feed"
        );

        let join = tokio::task::spawn_local(pump(
            connector,
            request.clone(),
            latest.clone(),
            status.clone(),
            stop_rx,
        ));

        Ok(Self {
            request,
            latest,
            status,
            cfg,
            join: Some(join),
            stop_tx: Some(stop_tx),
        })
    }

    /// Cell holding the most recent candle, `None` until the first update.
    #[must_use]
    pub fn latest(&self) -> Observable<Option<Candle>> {
        self.latest.clone()
    }

    /// Cell holding the feed lifecycle.
    #[must_use]
    pub fn status(&self) -> Observable<FeedStatus> {
        self.status.clone()
    }

    /// The subscription this feed follows.
    #[must_use]
    pub const fn request(&self) -> &StreamRequest {
        &self.request
    }

    /// Unsubscribe and wait for the pump to finish. Idempotent.
    ///
    /// Behavior and trade-offs:
    /// - The connector gets `FeedConfig::stop_timeout` to unsubscribe
    ///   gracefully; after that the pump is aborted.
    /// - A feed that was still live reports `Ended`; a failed feed keeps its
    ///   failure.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut join) = self.join.take() else {
            return;
        };
        if tokio::time::timeout(self.cfg.stop_timeout, &mut join)
            .await
            .is_err()
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                symbol = %self.request.symbol,
                timeout = ?self.cfg.stop_timeout,
                "live feed did not stop in time; aborting"
            );
            join.abort();
        }
        if !self.status.with(FeedStatus::is_terminal) {
            self.status.set(FeedStatus::Ended);
        }
    }

    /// Whether [`stop`](Self::stop) has completed.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.join.is_none()
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        drop_impl(&mut self.join, &mut self.stop_tx);
    }
}

impl std::fmt::Debug for LiveFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeed")
            .field("request", &self.request)
            .field("status", &self.status.get())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Reject updates that do not belong to the subscription.
fn check_update(request: &StreamRequest, update: &CandleUpdate) -> Result<(), CandelaError> {
    if update.symbol != request.symbol {
        return Err(CandelaError::invariant(format!(
            "stream for {} delivered an update for {}",
            request.symbol, update.symbol
        )));
    }
    if update.interval != request.interval {
        return Err(CandelaError::invariant(format!(
            "stream for {} {} delivered a {} candle",
            request.symbol, request.interval, update.interval
        )));
    }
    Ok(())
}

async fn pump(
    connector: Arc<dyn CandelaConnector>,
    request: StreamRequest,
    latest: Observable<Option<Candle>>,
    status: Observable<FeedStatus>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let Some(provider) = connector.as_stream_provider() else {
        status.set(FeedStatus::Failed(CandelaError::unsupported(
            "stream_candles",
        )));
        return;
    };

    let subscribed = tokio::select! {
        biased;
        _ = &mut stop_rx => return,
        res = provider.stream_candles(&request) => res,
    };
    let (handle, mut rx): (StreamHandle, mpsc::Receiver<CandleUpdate>) = match subscribed {
        Ok(pair) => pair,
        Err(err) => {
            #[cfg(feature = "tracing")]
            if err.is_actionable() {
                tracing::warn!(
                    connector = connector.name(),
                    symbol = %request.symbol,
                    error = %err,
                    "live feed subscription failed"
                );
            } else {
                tracing::debug!(
                    connector = connector.name(),
                    symbol = %request.symbol,
                    error = %err,
                    "live feed subscription unavailable"
                );
            }
            status.set(FeedStatus::Failed(err));
            return;
        }
    };
    status.set(FeedStatus::Live);

    let mut handle = Some(handle);
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                if let Some(h) = handle.take() { h.stop().await; }
                break;
            }
            maybe_u = rx.recv() => {
                let Some(u) = maybe_u else {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(symbol = %request.symbol, "live feed transport closed");
                    if let Some(h) = handle.take() { h.stop().await; }
                    status.set(FeedStatus::Ended);
                    break;
                };
                if let Err(err) = check_update(&request, &u) {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        connector = connector.name(),
                        error = %err,
                        "live feed received a foreign update; stopping"
                    );
                    if let Some(h) = handle.take() { h.stop().await; }
                    status.set(FeedStatus::Failed(err));
                    break;
                }
                #[cfg(feature = "tracing")]
                tracing::trace!(ts = %u.candle.ts, is_final = u.is_final, "live candle");
                latest.push(Some(u.candle));
            }
        }
    }
}
