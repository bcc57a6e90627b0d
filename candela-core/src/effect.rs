//! Effects that only fire once every tracked cell holds a value.
//!
//! A [`ConditionalEffect`] watches one or more `Observable<Option<T>>` cells.
//! On every change it first runs the cleanup returned by the previous
//! invocation, then reads all cells; if any is `None` the round ends there,
//! otherwise the callback receives the unwrapped values and may return a new
//! cleanup.
//!
//! # Invariants
//!
//! 1. The callback never observes a partially-defined input set.
//! 2. At most one cleanup is pending, and it runs before the next invocation
//!    and on disposal.
//! 3. A write from inside the callback to a tracked cell does not nest: the
//!    round is queued and runs after the current invocation returns.
//! 4. After [`dispose`](ConditionalEffect::dispose) the callback never runs again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::reactive::{Observable, Subscription};

/// Teardown returned by an effect callback.
pub type Cleanup = Box<dyn FnOnce()>;

/// A set of optional cells an effect can wait on.
///
/// Implemented for a single `Observable<Option<A>>` and for tuples of up to
/// four of them.
pub trait Dependencies: 'static {
    /// The narrowed values handed to the callback.
    type Values: 'static;

    /// Current values, or `None` if any cell is still empty.
    fn current(&self) -> Option<Self::Values>;

    /// Subscribe `notify` to every cell.
    fn watch(&self, notify: &Rc<dyn Fn()>) -> Vec<Subscription>;
}

impl<A> Dependencies for Observable<Option<A>>
where
    A: Clone + PartialEq + 'static,
{
    type Values = A;

    fn current(&self) -> Option<A> {
        self.get()
    }

    fn watch(&self, notify: &Rc<dyn Fn()>) -> Vec<Subscription> {
        let notify = Rc::clone(notify);
        vec![self.subscribe(move |_| notify())]
    }
}

macro_rules! impl_dependencies_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> Dependencies for ($(Observable<Option<$name>>,)+)
        where
            $($name: Clone + PartialEq + 'static,)+
        {
            type Values = ($($name,)+);

            fn current(&self) -> Option<Self::Values> {
                Some(($(self.$idx.get()?,)+))
            }

            fn watch(&self, notify: &Rc<dyn Fn()>) -> Vec<Subscription> {
                vec![$({
                    let notify = Rc::clone(notify);
                    self.$idx.subscribe(move |_| notify())
                }),+]
            }
        }
    };
}

impl_dependencies_for_tuple!(A: 0);
impl_dependencies_for_tuple!(A: 0, B: 1);
impl_dependencies_for_tuple!(A: 0, B: 1, C: 2);
impl_dependencies_for_tuple!(A: 0, B: 1, C: 2, D: 3);

type Callback<V> = Box<dyn FnMut(V) -> Option<Cleanup>>;

struct EffectState<V> {
    callback: Option<Callback<V>>,
    cleanup: Option<Cleanup>,
    subscriptions: Vec<Subscription>,
    running: bool,
    pending: bool,
    disposed: bool,
    invocations: u64,
}

struct EffectInner<D: Dependencies> {
    deps: D,
    state: RefCell<EffectState<D::Values>>,
}

trait ErasedEffect {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
    fn invocations(&self) -> u64;
}

/// Handle to a running conditional effect. Dropping it disposes the effect.
#[must_use = "dropping a ConditionalEffect disposes it immediately"]
pub struct ConditionalEffect {
    inner: Rc<dyn ErasedEffect>,
}

impl ConditionalEffect {
    /// Watch `deps` and run `callback` whenever all of them hold a value.
    ///
    /// The first round runs immediately.
    pub fn observe<D, F>(deps: D, callback: F) -> Self
    where
        D: Dependencies,
        F: FnMut(D::Values) -> Option<Cleanup> + 'static,
    {
        let inner = Rc::new(EffectInner {
            deps,
            state: RefCell::new(EffectState {
                callback: Some(Box::new(callback)),
                cleanup: None,
                subscriptions: Vec::new(),
                running: false,
                pending: false,
                disposed: false,
                invocations: 0,
            }),
        });

        let weak: Weak<EffectInner<D>> = Rc::downgrade(&inner);
        let notify: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(effect) = weak.upgrade() {
                effect.run();
            }
        });
        let subscriptions = inner.deps.watch(&notify);
        inner.state.borrow_mut().subscriptions = subscriptions;

        inner.run();
        Self { inner }
    }

    /// Run the pending cleanup and stop watching. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// How many times the callback has been invoked.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.inner.invocations()
    }
}

impl Drop for ConditionalEffect {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for ConditionalEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEffect")
            .field("disposed", &self.is_disposed())
            .field("invocations", &self.invocations())
            .finish()
    }
}

impl<D: Dependencies> EffectInner<D> {
    fn run(&self) {
        {
            let mut st = self.state.borrow_mut();
            if st.disposed {
                return;
            }
            if st.running {
                st.pending = true;
                return;
            }
            st.running = true;
        }

        loop {
            let previous = self.state.borrow_mut().cleanup.take();
            if let Some(cleanup) = previous {
                cleanup();
            }

            if let Some(values) = self.deps.current() {
                let taken = self.state.borrow_mut().callback.take();
                if let Some(mut callback) = taken {
                    let next = callback(values);
                    let mut st = self.state.borrow_mut();
                    st.invocations += 1;
                    if st.disposed {
                        drop(st);
                        drop(callback);
                        if let Some(cleanup) = next {
                            cleanup();
                        }
                    } else {
                        st.callback = Some(callback);
                        st.cleanup = next;
                    }
                }
            }

            let mut st = self.state.borrow_mut();
            if st.pending && !st.disposed {
                st.pending = false;
                continue;
            }
            st.pending = false;
            st.running = false;
            break;
        }
    }
}

impl<D: Dependencies> ErasedEffect for EffectInner<D> {
    fn dispose(&self) {
        let (cleanup, subscriptions, callback) = {
            let mut st = self.state.borrow_mut();
            if st.disposed {
                return;
            }
            st.disposed = true;
            (
                st.cleanup.take(),
                std::mem::take(&mut st.subscriptions),
                st.callback.take(),
            )
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        drop(subscriptions);
        drop(callback);
    }

    fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    fn invocations(&self) -> u64 {
        self.state.borrow().invocations
    }
}
