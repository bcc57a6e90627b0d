//! Candela turns a historical snapshot and a live candle stream into a
//! fixed-size, always-ordered window you can bind a chart to.
//!
//! Overview
//! - Connects to providers that implement the `candela_core` connector roles
//!   (`HistoryProvider`, `CandleStreamProvider`).
//! - Seeds each window once from a snapshot, then replaces the open period or
//!   rolls the window as live updates arrive.
//! - Exposes every piece of state as an `Observable` cell; nothing polls.
//!
//! Key behaviors and trade-offs
//! - Single-threaded: series, feeds and resources are `Rc` based and must be
//!   created inside a `tokio::task::LocalSet`. Connectors themselves stay
//!   `Send + Sync` and may run on any runtime flavor.
//! - Last request wins: a snapshot request superseded while in flight never
//!   overwrites newer state; superseded fetches are cancelled cooperatively.
//! - Capacity is fixed by the first non-empty snapshot. Refetching with a
//!   larger limit refreshes the snapshot state but does not grow the window.
//! - Transport that delivers candles for a different symbol or interval is
//!   treated as broken: the feed stops and reports `Failed(Invariant)`.
//!
//! Examples
//! Opening a live series:
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{Candela, Interval, SnapshotRequest, Symbol};
//!
//! let candela = Candela::builder()
//!     .with_connector(Arc::new(MyConnector::new()))
//!     .snapshot_limit(300)
//!     .build()?;
//!
//! let local = tokio::task::LocalSet::new();
//! local.run_until(async move {
//!     let mut series = candela.candles_for(Symbol::new("AAPL")?, Interval::I1m)?;
//!     let _sub = series.last_closed().subscribe(|c| println!("closed: {c:?}"));
//!     // ... render series.candles() ...
//!     series.close().await;
//!     Ok::<_, candela::CandelaError>(())
//! }).await?;
//! ```
//!
//! Using the resource engine directly:
//! ```rust,ignore
//! use candela::Observable;
//!
//! let symbol = Observable::new(Some("AAPL".to_string()));
//! let quote = candela.resource(&symbol, |s: String, _token| async move {
//!     fetch_quote(&s).await
//! });
//! symbol.set(Some("MSFT".into())); // AAPL result, if late, is discarded
//! ```
//!
//! See `candela/examples/` for a runnable end-to-end demonstration.
#![warn(missing_docs)]

pub(crate) mod core;
mod feed;
mod series;

pub use core::{Candela, CandelaBuilder};
pub use feed::{FeedStatus, LiveFeed};
pub use series::CandleSeries;

pub use candela_core::{
    Cancellation, CandelaConnector, ConditionalEffect, Fetcher, MergeOutcome, Observable,
    Resource, ResourceState, StreamingWindow, Subscription,
};

// Re-export shared types for convenience
pub use candela_core::{
    CandelaConfig, CandelaError, Candle, CandleUpdate, ConnectorKey, FeedConfig, Interval,
    SnapshotRequest, StreamRequest, Symbol, WindowConfig,
};
