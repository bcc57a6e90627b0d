//! candela-core
//!
//! Reactive building blocks for live candle charts.
//!
//! - `reactive`: observable cells with change notification.
//! - `effect`: effects that only fire once every input is defined.
//! - `resource`: generation-guarded async resources with cancellation.
//! - `window`: fixed-capacity candle windows seeded by a snapshot and fed by a
//!   live stream.
//! - `connector`: the `CandelaConnector` trait and its provider roles.
//!
//! Async runtime (Tokio)
//! ---------------------
//! Cells, effects and resources are single-threaded (`Rc` based). Fetches run
//! on `tokio::task::spawn_local`, so every `Resource` and `StreamingWindow`
//! must be created and driven inside a `tokio::task::LocalSet`. Connectors are
//! `Send + Sync` and their streaming sessions run as ordinary Tokio tasks:
//!
//! - `stream::StreamHandle` wraps `tokio::task::JoinHandle<()>` and uses
//!   `tokio::sync::oneshot::Sender<()>` for cooperative shutdown.
//! - `connector::CandleStreamProvider` returns
//!   `(StreamHandle, tokio::sync::mpsc::Receiver<CandleUpdate>)`.
//!
#![warn(missing_docs)]

/// Connector capability traits and the primary `CandelaConnector` interface.
pub mod connector;
pub mod effect;
pub mod reactive;
pub mod resource;
/// Stream handle and the drop-time helpers it is built on.
pub mod stream;
pub mod window;

pub use candela_types::*;
pub use connector::{CandelaConnector, CandleStreamProvider, HistoryProvider, SnapshotFetcher};
pub use effect::{Cleanup, ConditionalEffect, Dependencies};
pub use reactive::{Observable, Subscription, WeakObservable};
pub use resource::{Cancellation, Fetcher, Resource, ResourceState};
pub use stream::StreamHandle;
pub use window::{MergeOutcome, Period, StreamingWindow, last_closed, merge_into};
