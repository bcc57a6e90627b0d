use std::sync::Arc;

use candela_core::connector::{CandelaConnector, SnapshotFetcher};
use candela_core::reactive::Observable;
use candela_core::resource::{Cancellation, Fetcher, Resource};
use candela_core::{
    CandelaConfig, CandelaError, Candle, FeedConfig, Interval, SnapshotRequest, StreamRequest,
    Symbol, WindowConfig,
};

use crate::feed::LiveFeed;
use crate::series::CandleSeries;

/// Entry point that opens live candle series over registered connectors.
pub struct Candela {
    pub(crate) history: Arc<dyn CandelaConnector>,
    pub(crate) stream: Arc<dyn CandelaConnector>,
    pub(crate) cfg: CandelaConfig,
}

/// Builder for constructing a `Candela` facade with custom configuration.
pub struct CandelaBuilder {
    connectors: Vec<Arc<dyn CandelaConnector>>,
    cfg: CandelaConfig,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Create a new builder with sensible defaults.
    ///
    /// Behavior and trade-offs:
    /// - Starts with no connectors; you must register at least one via [`with_connector`](Self::with_connector).
    /// - Defaults: 500-period snapshots, out-of-order live records appended,
    ///   2s graceful stop for live feeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connectors: vec![],
            cfg: CandelaConfig::default(),
        }
    }

    /// Register a connector.
    ///
    /// Behavior and trade-offs:
    /// - The first registered connector that serves snapshots handles every
    ///   snapshot; the first one that streams handles every live feed. They may
    ///   be the same connector.
    /// - Duplicates are not deduplicated; registering the same connector twice
    ///   has no effect beyond the first registration.
    #[must_use]
    pub fn with_connector(mut self, c: Arc<dyn CandelaConnector>) -> Self {
        self.connectors.push(c);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: CandelaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Set the window merge policy.
    ///
    /// Behavior and trade-offs:
    /// - With `drop_out_of_order`, a late record for an already closed period
    ///   is discarded instead of appended; the window stays sorted but the late
    ///   data is lost.
    #[must_use]
    pub const fn window(mut self, cfg: WindowConfig) -> Self {
        self.cfg.window = cfg;
        self
    }

    /// Set live feed behavior.
    #[must_use]
    pub const fn feed(mut self, cfg: FeedConfig) -> Self {
        self.cfg.feed = cfg;
        self
    }

    /// Set the snapshot length used by [`Candela::candles`].
    ///
    /// Behavior and trade-offs:
    /// - This also fixes the window capacity, unless the connector returns
    ///   fewer periods than requested, in which case the shorter length wins.
    #[must_use]
    pub const fn snapshot_limit(mut self, limit: usize) -> Self {
        self.cfg.snapshot_limit = limit;
        self
    }

    /// Build the `Candela` facade.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no connectors have been registered or the
    /// snapshot limit is zero, and `Unsupported` if no registered connector
    /// serves snapshots or live candles.
    pub fn build(self) -> Result<Candela, CandelaError> {
        if self.connectors.is_empty() {
            return Err(CandelaError::InvalidArg(
                "no connectors registered; add at least one via with_connector(...)".to_string(),
            ));
        }
        if self.cfg.snapshot_limit == 0 {
            return Err(CandelaError::InvalidArg(
                "snapshot limit must be positive".to_string(),
            ));
        }

        let history = self
            .connectors
            .iter()
            .find(|c| c.as_history_provider().is_some())
            .cloned()
            .ok_or_else(|| CandelaError::unsupported("snapshot"))?;
        let stream = self
            .connectors
            .iter()
            .find(|c| c.as_stream_provider().is_some())
            .cloned()
            .ok_or_else(|| CandelaError::unsupported("stream_candles"))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            history = history.name(),
            stream = stream.name(),
            "candela facade built"
        );

        Ok(Candela {
            history,
            stream,
            cfg: self.cfg,
        })
    }
}

impl Candela {
    /// Start building a new `Candela` instance.
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &CandelaConfig {
        &self.cfg
    }

    /// Connector serving snapshots.
    #[must_use]
    pub fn history_connector(&self) -> &Arc<dyn CandelaConnector> {
        &self.history
    }

    /// Connector serving live candles.
    #[must_use]
    pub fn stream_connector(&self) -> &Arc<dyn CandelaConnector> {
        &self.stream
    }

    /// Open a live series for `request`.
    ///
    /// Behavior and trade-offs:
    /// - The snapshot is fetched and the live subscription opened concurrently;
    ///   live updates that arrive before the snapshot seeds the window are
    ///   dropped, which is harmless because the next push for the open period
    ///   replaces it.
    /// - Must be called inside a [`tokio::task::LocalSet`].
    ///
    /// # Errors
    /// Returns `Unsupported` if a connector lost a capability after `build()`.
    pub fn candles(&self, request: SnapshotRequest) -> Result<CandleSeries, CandelaError> {
        CandleSeries::open(
            Arc::clone(&self.history),
            Arc::clone(&self.stream),
            request,
            &self.cfg,
        )
    }

    /// Open a live series using the configured snapshot limit.
    ///
    /// # Errors
    /// Same as [`candles`](Self::candles).
    pub fn candles_for(
        &self,
        symbol: Symbol,
        interval: Interval,
    ) -> Result<CandleSeries, CandelaError> {
        let request = SnapshotRequest::new(symbol, interval, self.cfg.snapshot_limit)?;
        self.candles(request)
    }

    /// Subscribe to live candles without a window.
    ///
    /// # Errors
    /// Returns `Unsupported` if the stream connector cannot stream.
    pub fn live_feed(&self, request: StreamRequest) -> Result<LiveFeed, CandelaError> {
        LiveFeed::start(Arc::clone(&self.stream), request, self.cfg.feed)
    }

    /// Snapshot resource following an optional request cell.
    ///
    /// # Errors
    /// Returns `Unsupported` if the history connector cannot serve snapshots.
    pub fn snapshot_resource(
        &self,
        source: &Observable<Option<SnapshotRequest>>,
    ) -> Result<Resource<SnapshotRequest, Vec<Candle>>, CandelaError> {
        let fetcher = SnapshotFetcher::new(Arc::clone(&self.history))?;
        Ok(Resource::new(source, fetcher))
    }

    /// Bind any fetcher to a source cell with the generic resource engine.
    pub fn resource<S, D, E>(
        &self,
        source: &Observable<Option<S>>,
        fetcher: impl Fetcher<S, D, E> + 'static,
    ) -> Resource<S, D, E>
    where
        S: Clone + PartialEq + 'static,
        D: Clone + PartialEq + 'static,
        E: Clone + PartialEq + Cancellation + 'static,
    {
        Resource::new(source, fetcher)
    }
}
