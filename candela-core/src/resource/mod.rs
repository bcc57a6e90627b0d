//! Generation-guarded asynchronous resources.
//!
//! A [`Resource`] derives a `{data, loading, error}` cell from an optional
//! source cell and a [`Fetcher`]. Every source change and every
//! [`refetch`](Resource::refetch) starts a new *generation*; a fetch result is
//! applied only if its generation is still current when it completes, so the
//! last source value always wins regardless of completion order.
//!
//! Fetch tasks are spawned with [`tokio::task::spawn_local`]: resources must be
//! created and driven inside a [`tokio::task::LocalSet`].

mod fetcher;
mod state;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tokio_util::sync::CancellationToken;

pub use fetcher::{Cancellation, Fetcher};
pub use state::ResourceState;

use crate::reactive::{Observable, Subscription};
use candela_types::CandelaError;

struct FetchGuard {
    generation: u64,
    token: Option<CancellationToken>,
    disposed: bool,
}

struct ResourceInner<S, D, E> {
    source: Observable<Option<S>>,
    state: Observable<ResourceState<D, E>>,
    data: Observable<Option<D>>,
    fetcher: Rc<dyn Fetcher<S, D, E>>,
    guard: RefCell<FetchGuard>,
    subscription: RefCell<Option<Subscription>>,
}

/// Asynchronous value derived from a reactive source.
///
/// `None` in the source cell means "absent": the resource resets to idle and
/// invalidates any fetch in flight. Every `Some` value, including zero-like
/// ones, is a present source.
///
/// Dropping the handle disposes the resource.
pub struct Resource<S, D, E = CandelaError>
where
    S: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    inner: Rc<ResourceInner<S, D, E>>,
}

impl<S, D, E> Resource<S, D, E>
where
    S: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    /// Bind `fetcher` to `source` and evaluate the current source immediately.
    ///
    /// # Panics
    /// Panics if the source is present and the caller is not running inside a
    /// [`tokio::task::LocalSet`].
    pub fn new(source: &Observable<Option<S>>, fetcher: impl Fetcher<S, D, E> + 'static) -> Self {
        let state = Observable::new(ResourceState::idle());
        let data = state.map(|s: &ResourceState<D, E>| s.data.clone());
        let inner = Rc::new(ResourceInner {
            source: source.clone(),
            state,
            data,
            fetcher: Rc::new(fetcher),
            guard: RefCell::new(FetchGuard {
                generation: 0,
                token: None,
                disposed: false,
            }),
            subscription: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = source.subscribe(move |value: &Option<S>| {
            if let Some(inner) = weak.upgrade() {
                ResourceInner::transition(&inner, value.clone());
            }
        });
        *inner.subscription.borrow_mut() = Some(subscription);

        ResourceInner::transition(&inner, source.get());
        Self { inner }
    }

    /// The `{data, loading, error}` cell.
    #[must_use]
    pub fn state(&self) -> Observable<ResourceState<D, E>> {
        self.inner.state.clone()
    }

    /// Derived cell holding only `state.data`.
    #[must_use]
    pub fn data(&self) -> Observable<Option<D>> {
        self.inner.data.clone()
    }

    /// The source cell this resource follows.
    #[must_use]
    pub fn source(&self) -> Observable<Option<S>> {
        self.inner.source.clone()
    }

    /// Re-read the source and start a new generation.
    ///
    /// Resets to idle instead when the source is currently absent.
    pub fn refetch(&self) {
        let current = self.inner.source.get();
        ResourceInner::transition(&self.inner, current);
    }

    /// Current generation number.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.guard.borrow().generation
    }

    /// Stop following the source and ignore every outstanding fetch. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.guard.borrow().disposed
    }
}

impl<S, D, E> Drop for Resource<S, D, E>
where
    S: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl<S, D, E> std::fmt::Debug for Resource<S, D, E>
where
    S: Clone + PartialEq + 'static,
    D: Clone + PartialEq + std::fmt::Debug + 'static,
    E: Clone + PartialEq + Cancellation + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.guard.borrow();
        f.debug_struct("Resource")
            .field("generation", &guard.generation)
            .field("disposed", &guard.disposed)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl<S, D, E> ResourceInner<S, D, E>
where
    S: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Cancellation + 'static,
{
    fn transition(this: &Rc<Self>, source: Option<S>) {
        let (generation, token) = {
            let mut guard = this.guard.borrow_mut();
            if guard.disposed {
                return;
            }
            if let Some(previous) = guard.token.take() {
                previous.cancel();
            }
            guard.generation += 1;
            let generation = guard.generation;

            if source.is_none() {
                drop(guard);
                #[cfg(feature = "tracing")]
                tracing::debug!(generation, "resource source absent; resetting to idle");
                if !this.state.with(ResourceState::is_idle) {
                    this.state.set(ResourceState::idle());
                }
                return;
            }

            let token = CancellationToken::new();
            guard.token = Some(token.clone());
            (generation, token)
        };
        let Some(source) = source else {
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(generation, "resource fetch started");
        this.state.update(|s| {
            let previous = std::mem::take(s);
            *s = previous.revalidating();
        });

        let weak: Weak<Self> = Rc::downgrade(this);
        let fetcher = Rc::clone(&this.fetcher);
        tokio::task::spawn_local(async move {
            let outcome = fetcher.fetch(source, token.clone()).await;
            if let Some(inner) = weak.upgrade() {
                inner.complete(generation, &token, outcome);
            }
        });
    }

    fn complete(&self, generation: u64, token: &CancellationToken, outcome: Result<D, E>) {
        let current = {
            let mut guard = self.guard.borrow_mut();
            let current = !guard.disposed && guard.generation == generation;
            if current {
                guard.token = None;
            }
            current
        };

        match outcome {
            Ok(data) => {
                if current && !token.is_cancelled() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(generation, "resource fetch applied");
                    self.state.set(ResourceState::success(data));
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(generation, "discarding stale resource result");
                }
            }
            Err(err) if err.is_cancellation() => {
                #[cfg(feature = "tracing")]
                tracing::trace!(generation, "resource fetch cancelled");
            }
            Err(err) => {
                if current {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(generation, "resource fetch failed");
                    self.state.set(ResourceState::failed(err));
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(generation, "discarding stale resource failure");
                }
            }
        }
    }

    fn dispose(&self) {
        let subscription = {
            let mut guard = self.guard.borrow_mut();
            if guard.disposed {
                return;
            }
            guard.disposed = true;
            guard.generation += 1;
            if let Some(token) = guard.token.take() {
                token.cancel();
            }
            self.subscription.borrow_mut().take()
        };
        drop(subscription);
    }
}
