use std::sync::Arc;
use std::time::Duration;

use candela::{Candela, FeedStatus, Interval, Symbol};
use candela_mock::MockConnector;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,candela=debug,candela_core=trace
    // (run with `--features tracing` to see the library's own events)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();

    let mock = MockConnector::new().with_pace(Duration::from_millis(100));
    let candela = Candela::builder()
        .with_connector(Arc::new(mock))
        .snapshot_limit(10)
        .build()?;

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let mut series = candela.candles_for(Symbol::new("AAPL")?, Interval::I1m)?;

            let _closed = series.last_closed().subscribe(|c| {
                if let Some(c) = c {
                    println!("closed  {} close={}", c.ts, c.close);
                }
            });
            let window = series.candles();
            let _ticks = series.live().subscribe(move |c| {
                if let Some(c) = c {
                    println!("tick    {} close={} (window={})", c.ts, c.close, window.with(Vec::len));
                }
            });

            let status = series.feed_status();
            while !status.with(FeedStatus::is_terminal) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            println!("final window:");
            for c in series.candles().get() {
                println!("  {} o={} h={} l={} c={}", c.ts, c.open, c.high, c.low, c.close);
            }
            series.close().await;
            Ok::<_, Box<dyn std::error::Error>>(())
        })
        .await
}
