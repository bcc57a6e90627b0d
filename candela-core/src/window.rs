//! Bounded candle windows fed by a snapshot and a live stream.
//!
//! A [`StreamingWindow`] seeds itself once from a historical snapshot
//! [`Resource`] and then folds every live record into the window:
//!
//! - same period start as the last element: the period is still open, replace
//!   the last element;
//! - otherwise the previous period closed: append, evicting the oldest element
//!   once the length would exceed the capacity.
//!
//! The capacity is the length of the first non-empty snapshot and never
//! changes afterwards, even if the snapshot resource refetches with a larger
//! limit.

use std::cell::Cell;
use std::rc::Rc;

use candela_types::{Candle, CandelaError, WindowConfig};
use chrono::{DateTime, Utc};

use crate::effect::ConditionalEffect;
use crate::reactive::Observable;
use crate::resource::{Cancellation, Fetcher, Resource, ResourceState};

/// A record keyed by the start of the period it describes.
pub trait Period: Clone + PartialEq + 'static {
    /// Start of the period; equal starts denote the same period.
    fn period_start(&self) -> DateTime<Utc>;
}

impl Period for Candle {
    fn period_start(&self) -> DateTime<Utc> {
        self.ts
    }
}

/// What [`merge_into`] did with a live record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The window is not seeded yet; the record was ignored.
    NotSeeded,
    /// The record replaced the still-open last period.
    Replaced,
    /// The record opened a new period.
    Appended {
        /// Whether the oldest period was evicted to stay within capacity.
        evicted: bool,
    },
    /// The record started before the open period and out-of-order records
    /// are configured to be dropped.
    Dropped,
}

/// Fold one live record into `window`.
///
/// `window` must already respect `capacity`.
pub fn merge_into<P: Period>(
    window: &mut Vec<P>,
    capacity: usize,
    record: P,
    config: &WindowConfig,
) -> MergeOutcome {
    let Some(last) = window.last_mut() else {
        return MergeOutcome::NotSeeded;
    };

    let last_start = last.period_start();
    let start = record.period_start();
    if start == last_start {
        *last = record;
        return MergeOutcome::Replaced;
    }
    if config.drop_out_of_order && start < last_start {
        return MergeOutcome::Dropped;
    }

    window.push(record);
    let evicted = window.len() > capacity;
    if evicted {
        window.remove(0);
    }
    MergeOutcome::Appended { evicted }
}

/// The element right before the open period, if any.
#[must_use]
pub fn last_closed<P: Clone>(window: &[P]) -> Option<P> {
    window.len().checked_sub(2).map(|i| window[i].clone())
}

struct WindowShared {
    capacity: Cell<Option<usize>>,
    disposed: Cell<bool>,
}

/// Fixed-capacity, always-ordered window of periods.
///
/// Dropping the handle disposes it.
pub struct StreamingWindow<P, S, E = CandelaError>
where
    P: Period,
    S: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    candles: Observable<Vec<P>>,
    last_closed: Observable<Option<P>>,
    shared: Rc<WindowShared>,
    snapshot: Resource<S, Vec<P>, E>,
    seed: ConditionalEffect,
    merge: ConditionalEffect,
}

impl<P, S, E> StreamingWindow<P, S, E>
where
    P: Period,
    S: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    /// Build a window over `live`, seeded by fetching `snapshot_source`.
    ///
    /// # Panics
    /// Panics if the snapshot source is present and the caller is not running
    /// inside a [`tokio::task::LocalSet`].
    pub fn new(
        live: &Observable<Option<P>>,
        snapshot_source: &Observable<Option<S>>,
        fetcher: impl Fetcher<S, Vec<P>, E> + 'static,
        config: WindowConfig,
    ) -> Self {
        let candles: Observable<Vec<P>> = Observable::new(Vec::new());
        let closed = candles.map(|w: &Vec<P>| last_closed(w));
        let shared = Rc::new(WindowShared {
            capacity: Cell::new(None),
            disposed: Cell::new(false),
        });
        let snapshot = Resource::new(snapshot_source, fetcher);

        let seed = {
            let candles = candles.clone();
            let shared = Rc::clone(&shared);
            ConditionalEffect::observe(snapshot.data(), move |records: Vec<P>| {
                if shared.capacity.get().is_some() || records.is_empty() {
                    return None;
                }
                if !candles.with(Vec::is_empty) {
                    return None;
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(capacity = records.len(), "seeding window from snapshot");
                shared.capacity.set(Some(records.len()));
                candles.set(records);
                None
            })
        };

        let merge = {
            let candles = candles.clone();
            let shared = Rc::clone(&shared);
            ConditionalEffect::observe(live.clone(), move |record: P| {
                let Some(capacity) = shared.capacity.get() else {
                    return None;
                };
                let mut next = candles.get();
                let outcome = merge_into(&mut next, capacity, record, &config);
                match outcome {
                    MergeOutcome::Replaced | MergeOutcome::Appended { .. } => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(?outcome, len = next.len(), "merged live period");
                        candles.set(next);
                    }
                    MergeOutcome::Dropped => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("dropping out-of-order live period");
                    }
                    MergeOutcome::NotSeeded => {}
                }
                None
            })
        };

        Self {
            candles,
            last_closed: closed,
            shared,
            snapshot,
            seed,
            merge,
        }
    }

    /// The window cell.
    #[must_use]
    pub fn candles(&self) -> Observable<Vec<P>> {
        self.candles.clone()
    }

    /// Derived cell holding `window[len - 2]`, `None` while fewer than two
    /// periods are present.
    #[must_use]
    pub fn last_closed(&self) -> Observable<Option<P>> {
        self.last_closed.clone()
    }

    /// Fixed capacity, known once the window has been seeded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity.get()
    }

    /// Whether the snapshot has seeded the window.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.shared.capacity.get().is_some()
    }

    /// The snapshot resource, for `refetch` or inspection.
    #[must_use]
    pub const fn snapshot(&self) -> &Resource<S, Vec<P>, E> {
        &self.snapshot
    }

    /// State of the snapshot fetch.
    #[must_use]
    pub fn snapshot_state(&self) -> Observable<ResourceState<Vec<P>, E>> {
        self.snapshot.state()
    }

    /// Stop merging and seeding, and dispose the snapshot resource. Idempotent.
    pub fn dispose(&self) {
        if self.shared.disposed.replace(true) {
            return;
        }
        self.seed.dispose();
        self.merge.dispose();
        self.snapshot.dispose();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}

impl<P, S, E> Drop for StreamingWindow<P, S, E>
where
    P: Period,
    S: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Bar {
        start: i64,
        close: i32,
    }

    impl Period for Bar {
        fn period_start(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.start, 0).unwrap()
        }
    }

    fn bar(start: i64, close: i32) -> Bar {
        Bar { start, close }
    }

    #[test]
    fn empty_window_ignores_records() {
        let mut w: Vec<Bar> = Vec::new();
        let out = merge_into(&mut w, 3, bar(1, 1), &WindowConfig::default());
        assert_eq!(out, MergeOutcome::NotSeeded);
        assert!(w.is_empty());
    }

    #[test]
    fn same_start_replaces_last() {
        let mut w = vec![bar(1, 1), bar(2, 2)];
        let out = merge_into(&mut w, 2, bar(2, 5), &WindowConfig::default());
        assert_eq!(out, MergeOutcome::Replaced);
        assert_eq!(w, vec![bar(1, 1), bar(2, 5)]);
    }

    #[test]
    fn new_start_appends_and_evicts_at_capacity() {
        let mut w = vec![bar(1, 1), bar(2, 2)];
        let out = merge_into(&mut w, 2, bar(3, 3), &WindowConfig::default());
        assert_eq!(out, MergeOutcome::Appended { evicted: true });
        assert_eq!(w, vec![bar(2, 2), bar(3, 3)]);
    }

    #[test]
    fn older_start_is_appended_unless_configured_to_drop() {
        let mut w = vec![bar(5, 1), bar(6, 2)];
        let out = merge_into(&mut w, 3, bar(4, 9), &WindowConfig::default());
        assert_eq!(out, MergeOutcome::Appended { evicted: false });
        assert_eq!(w.len(), 3);

        let mut w = vec![bar(5, 1), bar(6, 2)];
        let cfg = WindowConfig {
            drop_out_of_order: true,
        };
        let out = merge_into(&mut w, 3, bar(4, 9), &cfg);
        assert_eq!(out, MergeOutcome::Dropped);
        assert_eq!(w, vec![bar(5, 1), bar(6, 2)]);
    }

    #[test]
    fn last_closed_needs_two_periods() {
        assert_eq!(last_closed::<Bar>(&[]), None);
        assert_eq!(last_closed(&[bar(1, 1)]), None);
        assert_eq!(last_closed(&[bar(1, 1), bar(2, 2)]), Some(bar(1, 1)));
    }
}
