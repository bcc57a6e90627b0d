//! Candela data transfer objects, error type, and configuration primitives.
#![warn(missing_docs)]

mod config;
mod connector;
mod error;
mod market;

pub use config::{CandelaConfig, FeedConfig, WindowConfig};
pub use connector::ConnectorKey;
pub use error::CandelaError;
pub use market::{Candle, CandleUpdate, Interval, SnapshotRequest, StreamRequest, Symbol};
