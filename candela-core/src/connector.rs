use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::resource::Fetcher;
use crate::stream::StreamHandle;
use candela_types::{
    CandelaError, Candle, CandleUpdate, ConnectorKey, SnapshotRequest, StreamRequest,
};

/// Focused role trait for connectors that serve historical candle snapshots.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetch the most recent `req.limit` candles, oldest first.
    async fn snapshot(&self, req: &SnapshotRequest) -> Result<Vec<Candle>, CandelaError>;
}

/// Focused role trait for connectors that push live candle updates.
#[async_trait]
pub trait CandleStreamProvider: Send + Sync {
    /// Start a streaming session for one symbol and interval.
    ///
    /// Stopping the returned handle unsubscribes; the receiver yields `None`
    /// once the session ends.
    async fn stream_candles(
        &self,
        req: &StreamRequest,
    ) -> Result<(StreamHandle, tokio::sync::mpsc::Receiver<CandleUpdate>), CandelaError>;
}

/// A market-data connector advertising which roles it can play.
pub trait CandelaConnector: Send + Sync {
    /// Human-readable connector name.
    fn name(&self) -> &'static str;

    /// Typed key derived from [`name`](Self::name).
    fn key(&self) -> ConnectorKey {
        ConnectorKey::new(self.name())
    }

    /// If implemented, returns a trait object for historical snapshots.
    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        None
    }

    /// If implemented, returns a trait object for live candle streaming.
    fn as_stream_provider(&self) -> Option<&dyn CandleStreamProvider> {
        None
    }
}

/// [`Fetcher`] that loads snapshots from a connector and honors cancellation.
///
/// When the token fires before the connector answers, the pending call is
/// dropped and the fetch resolves to [`CandelaError::Cancelled`].
#[derive(Clone)]
pub struct SnapshotFetcher {
    connector: Arc<dyn CandelaConnector>,
}

impl SnapshotFetcher {
    /// Wrap a connector.
    ///
    /// # Errors
    /// Returns `Unsupported` if the connector cannot serve snapshots.
    pub fn new(connector: Arc<dyn CandelaConnector>) -> Result<Self, CandelaError> {
        if connector.as_history_provider().is_none() {
            return Err(CandelaError::unsupported("snapshot"));
        }
        Ok(Self { connector })
    }
}

#[async_trait(?Send)]
impl Fetcher<SnapshotRequest, Vec<Candle>, CandelaError> for SnapshotFetcher {
    async fn fetch(
        &self,
        source: SnapshotRequest,
        token: CancellationToken,
    ) -> Result<Vec<Candle>, CandelaError> {
        let Some(provider) = self.connector.as_history_provider() else {
            return Err(CandelaError::unsupported("snapshot"));
        };
        tokio::select! {
            biased;
            () = token.cancelled() => Err(CandelaError::Cancelled),
            res = provider.snapshot(&source) => res.map_err(|err| tag_err(self.connector.name(), err)),
        }
    }
}

/// Attribute a non-connector error to `connector`, leaving benign ones intact.
pub fn tag_err(connector: &str, err: CandelaError) -> CandelaError {
    match err {
        CandelaError::NotFound { .. }
        | CandelaError::Unsupported { .. }
        | CandelaError::InvalidArg(_)
        | CandelaError::Connector { .. }
        | CandelaError::Cancelled => err,
        other => CandelaError::connector(connector, other.to_string()),
    }
}
