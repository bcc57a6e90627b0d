use candela_core::{Candle, CandleUpdate, Interval, Symbol};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

/// Number of historical periods available per symbol.
pub const HISTORY_LEN: usize = 120;

/// Live periods scripted after the last historical one.
pub const LIVE_PERIODS: usize = 3;

/// Updates per live period; the last one is marked final.
pub const TICKS_PER_PERIOD: usize = 3;

/// Start of the first historical period before interval alignment.
fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Base price in cents for symbols the mock knows about.
fn base_cents(symbol: &str) -> Option<i64> {
    match symbol {
        "AAPL" => Some(18_500),
        "MSFT" => Some(37_000),
        "TSLA" => Some(24_800),
        "BTCUSD" => Some(4_200_000),
        _ => None,
    }
}

fn period_ts(interval: Interval, index: usize) -> DateTime<Utc> {
    let start = interval.period_start(anchor());
    let step = interval.seconds() * i64::try_from(index).unwrap_or(i64::MAX / 2);
    DateTime::from_timestamp(start.timestamp() + step, 0).unwrap_or(start)
}

fn wiggle(index: usize, salt: usize) -> i64 {
    i64::try_from((index * 37 + salt * 11) % 21).unwrap_or(0) - 10
}

fn build(ts: DateTime<Utc>, open: i64, close: i64, volume: u64) -> Candle {
    let high = open.max(close) + 5;
    let low = open.min(close) - 5;
    Candle {
        ts,
        open: Decimal::new(open, 2),
        high: Decimal::new(high, 2),
        low: Decimal::new(low, 2),
        close: Decimal::new(close, 2),
        volume: Some(volume),
    }
}

fn closes(base: i64) -> impl Iterator<Item = i64> {
    (0..HISTORY_LEN + LIVE_PERIODS).scan(base, |px, i| {
        *px += wiggle(i, 0);
        Some(*px)
    })
}

/// Full history for `symbol`, oldest first, or `None` for unknown symbols.
#[must_use]
pub fn history(symbol: &Symbol, interval: Interval) -> Option<Vec<Candle>> {
    let base = base_cents(symbol.as_str())?;
    let mut open = base;
    let candles = closes(base)
        .take(HISTORY_LEN)
        .enumerate()
        .map(|(i, close)| {
            let c = build(period_ts(interval, i), open, close, 1_000 + (i as u64 % 7) * 250);
            open = close;
            c
        })
        .collect();
    Some(candles)
}

/// The most recent `limit` historical candles.
#[must_use]
pub fn snapshot(symbol: &Symbol, interval: Interval, limit: usize) -> Option<Vec<Candle>> {
    let all = history(symbol, interval)?;
    let skip = all.len().saturating_sub(limit);
    Some(all.into_iter().skip(skip).collect())
}

/// Scripted live updates that continue right after [`history`].
///
/// The first period revises the last historical candle, so a window seeded
/// from a snapshot sees an in-place update before it starts rolling.
#[must_use]
pub fn live_updates(symbol: &Symbol, interval: Interval) -> Vec<CandleUpdate> {
    let Some(base) = base_cents(symbol.as_str()) else {
        return Vec::new();
    };
    let all: Vec<i64> = closes(base).collect();
    let first = HISTORY_LEN - 1;
    let mut out = Vec::with_capacity(LIVE_PERIODS * TICKS_PER_PERIOD);
    for period in first..first + LIVE_PERIODS {
        let open = if period == 0 { base } else { all[period - 1] };
        for tick in 0..TICKS_PER_PERIOD {
            let close = all[period] + wiggle(period, tick + 1);
            out.push(CandleUpdate {
                symbol: symbol.clone(),
                interval,
                candle: build(period_ts(interval, period), open, close, 500 * (tick as u64 + 1)),
                is_final: tick + 1 == TICKS_PER_PERIOD,
            });
        }
    }
    out
}
