use candela_core::window::{MergeOutcome, last_closed, merge_into};
use candela_core::{Candle, WindowConfig};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn candle(minute: i64, close: i64) -> Candle {
    let px = Decimal::from(close);
    Candle {
        ts: Utc.timestamp_opt(minute * 60, 0).unwrap(),
        open: px,
        high: px,
        low: px,
        close: px,
        volume: None,
    }
}

fn seeded(len: usize) -> Vec<Candle> {
    (0..len as i64).map(|m| candle(m, m)).collect()
}

proptest! {
    #[test]
    fn length_never_changes_after_seeding(
        cap in 1usize..8,
        steps in proptest::collection::vec((0i64..3, 0i64..1_000), 0..64),
    ) {
        let mut window = seeded(cap);
        let config = WindowConfig::default();
        for (advance, close) in steps {
            let last = window.last().map_or(0, |c| c.ts.timestamp() / 60);
            let outcome = merge_into(&mut window, cap, candle(last + advance, close), &config);
            prop_assert_ne!(outcome, MergeOutcome::NotSeeded);
            prop_assert_eq!(window.len(), cap);
        }
    }

    #[test]
    fn monotonic_stream_keeps_window_sorted(
        cap in 2usize..6,
        steps in proptest::collection::vec((0i64..3, 0i64..1_000), 1..64),
    ) {
        let mut window = seeded(cap);
        let config = WindowConfig::default();
        for (advance, close) in steps {
            let last = window.last().map_or(0, |c| c.ts.timestamp() / 60);
            merge_into(&mut window, cap, candle(last + advance, close), &config);
            prop_assert!(window.windows(2).all(|w| w[0].ts < w[1].ts));
        }
        prop_assert_eq!(last_closed(&window), Some(window[cap - 2].clone()));
    }

    #[test]
    fn replacing_the_open_period_is_idempotent(cap in 1usize..6, close in 0i64..1_000) {
        let mut window = seeded(cap);
        let open = (cap as i64) - 1;
        let config = WindowConfig::default();
        merge_into(&mut window, cap, candle(open, close), &config);
        let once = window.clone();
        let outcome = merge_into(&mut window, cap, candle(open, close), &config);
        prop_assert_eq!(outcome, MergeOutcome::Replaced);
        prop_assert_eq!(window, once);
    }
}
