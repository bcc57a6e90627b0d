//! Deterministic candle data served by [`MockConnector`](crate::MockConnector).

pub mod candles;
