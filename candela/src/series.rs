use std::sync::Arc;

use candela_core::connector::{CandelaConnector, SnapshotFetcher};
use candela_core::reactive::Observable;
use candela_core::resource::ResourceState;
use candela_core::window::StreamingWindow;
use candela_core::{CandelaConfig, CandelaError, Candle, SnapshotRequest};

use crate::feed::{FeedStatus, LiveFeed};

/// A live candle chart: snapshot-seeded window plus the feed that rolls it.
///
/// Dropping the series stops the feed on a best-effort basis and disposes the
/// window; prefer [`close`](Self::close) to wait for the unsubscribe.
pub struct CandleSeries {
    request: Observable<Option<SnapshotRequest>>,
    feed: LiveFeed,
    window: StreamingWindow<Candle, SnapshotRequest>,
}

impl CandleSeries {
    pub(crate) fn open(
        history: Arc<dyn CandelaConnector>,
        stream: Arc<dyn CandelaConnector>,
        request: SnapshotRequest,
        cfg: &CandelaConfig,
    ) -> Result<Self, CandelaError> {
        let fetcher = SnapshotFetcher::new(history)?;
        let feed = LiveFeed::start(stream, request.stream_request(), cfg.feed)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            symbol = %request.symbol,
            interval = %request.interval,
            limit = request.limit,
            "opening candle series"
        );

        let source = Observable::new(Some(request));
        let window = StreamingWindow::new(&feed.latest(), &source, fetcher, cfg.window);
        Ok(Self {
            request: source,
            feed,
            window,
        })
    }

    /// Ordered window cell, oldest first.
    #[must_use]
    pub fn candles(&self) -> Observable<Vec<Candle>> {
        self.window.candles()
    }

    /// The most recent closed period, `None` while fewer than two are present.
    #[must_use]
    pub fn last_closed(&self) -> Observable<Option<Candle>> {
        self.window.last_closed()
    }

    /// State of the historical snapshot fetch.
    #[must_use]
    pub fn snapshot_state(&self) -> Observable<ResourceState<Vec<Candle>>> {
        self.window.snapshot_state()
    }

    /// Lifecycle of the live feed.
    #[must_use]
    pub fn feed_status(&self) -> Observable<FeedStatus> {
        self.feed.status()
    }

    /// Most recent raw update from the feed.
    #[must_use]
    pub fn live(&self) -> Observable<Option<Candle>> {
        self.feed.latest()
    }

    /// The snapshot request this series was opened with.
    #[must_use]
    pub fn request(&self) -> Option<SnapshotRequest> {
        self.request.get()
    }

    /// Window capacity, known once the snapshot has seeded the window.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.window.capacity()
    }

    /// Fetch the snapshot again.
    ///
    /// Behavior and trade-offs:
    /// - Only the snapshot state changes; a seeded window is never reseeded,
    ///   so its capacity and contents keep following the live feed.
    /// - Useful to recover from a failed initial snapshot.
    pub fn refetch(&self) {
        self.window.snapshot().refetch();
    }

    /// Stop the feed and dispose the window. Idempotent.
    pub async fn close(&mut self) {
        self.feed.stop().await;
        self.window.dispose();
    }

    /// Whether [`close`](Self::close) has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.feed.is_stopped() && self.window.is_disposed()
    }
}

impl std::fmt::Debug for CandleSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleSeries")
            .field("request", &self.request.get())
            .field("capacity", &self.capacity())
            .field("feed", &self.feed)
            .finish_non_exhaustive()
    }
}
