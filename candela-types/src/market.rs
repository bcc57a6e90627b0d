//! Market-data values exchanged between connectors and the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CandelaError;

/// Ticker symbol, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Build a symbol from user input.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the trimmed input is empty or contains whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CandelaError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CandelaError::InvalidArg("symbol cannot be empty".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CandelaError::InvalidArg(format!(
                "symbol '{trimmed}' contains whitespace"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Borrow the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candle period length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Interval {
    /// One minute.
    #[serde(rename = "1m")]
    I1m,
    /// Five minutes.
    #[serde(rename = "5m")]
    I5m,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    I15m,
    /// One hour.
    #[serde(rename = "1h")]
    I1h,
    /// Four hours.
    #[serde(rename = "4h")]
    I4h,
    /// One day.
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    /// Length of one period in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::I1m => 60,
            Self::I5m => 300,
            Self::I15m => 900,
            Self::I1h => 3_600,
            Self::I4h => 14_400,
            Self::D1 => 86_400,
        }
    }

    /// Floor `ts` to the start of the period that contains it.
    #[must_use]
    pub fn period_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.seconds();
        let secs = ts.timestamp().div_euclid(step) * step;
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(ts)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::I1m => "1m",
            Self::I5m => "5m",
            Self::I15m => "15m",
            Self::I1h => "1h",
            Self::I4h => "4h",
            Self::D1 => "1d",
        };
        f.write_str(s)
    }
}

/// One OHLCV period keyed by its start timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Period start.
    pub ts: DateTime<Utc>,
    /// Opening price.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Last traded price (still moving while the period is open).
    pub close: Decimal,
    /// Traded volume, when the venue reports it.
    pub volume: Option<u64>,
}

/// Parameters for a one-time historical snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotRequest {
    /// Instrument to load.
    pub symbol: Symbol,
    /// Period length.
    pub interval: Interval,
    /// Number of most recent periods to return.
    pub limit: usize,
}

impl SnapshotRequest {
    /// Build a snapshot request.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `limit` is zero.
    pub fn new(symbol: Symbol, interval: Interval, limit: usize) -> Result<Self, CandelaError> {
        if limit == 0 {
            return Err(CandelaError::InvalidArg(
                "snapshot limit must be positive".into(),
            ));
        }
        Ok(Self {
            symbol,
            interval,
            limit,
        })
    }

    /// The live subscription that matches this snapshot.
    #[must_use]
    pub fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            symbol: self.symbol.clone(),
            interval: self.interval,
        }
    }
}

/// Parameters for a live candle subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Instrument to follow.
    pub symbol: Symbol,
    /// Period length.
    pub interval: Interval,
}

/// One push from a live candle stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleUpdate {
    /// Instrument the update belongs to; checked against the subscription.
    pub symbol: Symbol,
    /// Period length of the carried candle.
    pub interval: Interval,
    /// Latest state of the period.
    pub candle: Candle,
    /// Whether the venue marked the period as closed.
    pub is_final: bool,
}
