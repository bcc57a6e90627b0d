#![allow(dead_code)]

use std::time::Duration;

use candela::{Candle, CandleUpdate, Interval, SnapshotRequest, Symbol};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

pub const AAPL: &str = "AAPL";
pub const MSFT: &str = "MSFT";

pub fn sym(s: &str) -> Symbol {
    Symbol::new(s).expect("valid symbol")
}

pub fn minute(m: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + m * 60, 0).unwrap()
}

pub fn candle(m: i64, close: i64) -> Candle {
    let px = Decimal::from(close);
    Candle {
        ts: minute(m),
        open: px,
        high: px,
        low: px,
        close: px,
        volume: Some(1),
    }
}

pub fn update(symbol: &str, m: i64, close: i64) -> CandleUpdate {
    CandleUpdate {
        symbol: sym(symbol),
        interval: Interval::I1m,
        candle: candle(m, close),
        is_final: false,
    }
}

pub fn snapshot_req(symbol: &str, limit: usize) -> SnapshotRequest {
    SnapshotRequest::new(sym(symbol), Interval::I1m, limit).expect("valid request")
}

/// Let local tasks and the paused clock make progress.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
