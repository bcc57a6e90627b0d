use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
    /// Guards on upstream cells for derived observables.
    upstream: Vec<Subscription>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** cell.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

/// Non-owning handle to an [`Observable`].
pub struct WeakObservable<T> {
    inner: Weak<RefCell<ObservableInner<T>>>,
}

/// Keeps a subscriber callback registered while alive.
///
/// The cell only holds a weak reference to the callback, so dropping this
/// guard (or calling [`unsubscribe`](Subscription::unsubscribe)) removes it.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    guard: Option<Box<dyn Any>>,
}

impl Subscription {
    /// Remove the callback now.
    pub fn unsubscribe(mut self) {
        self.guard.take();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.guard.is_some())
            .finish()
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a cell holding `value` at version 0.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                upstream: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Clone of the current value, read without registering interest.
    ///
    /// Cells never track reads, so this is the same as [`get`](Self::get); it
    /// exists to make untracked reads inside callbacks explicit.
    #[must_use]
    pub fn peek(&self) -> T {
        self.get()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// `f` must not write this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of effective mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value and notify subscribers if it changed.
    pub fn set(&self, value: T) {
        if self.inner.borrow().value == value {
            return;
        }
        self.push(value);
    }

    /// Replace the value and notify subscribers even if it is unchanged.
    ///
    /// For event-like cells where every write is an occurrence, such as a
    /// transport re-sending the same candle. Counts as a mutation.
    pub fn push(&self, value: T) {
        let (version, snapshot, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            inner.version += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let subscribers: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (inner.version, inner.value.clone(), subscribers)
        };

        for callback in subscribers {
            // A nested write already delivered a newer value to everyone.
            if self.inner.borrow().version != version {
                break;
            }
            callback(&snapshot);
        }
    }

    /// Mutate a copy of the value in place, then [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Register `callback` to run after every effective change.
    ///
    /// The callback is not invoked for the current value.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|w| w.strong_count() > 0);
        inner.subscribers.push(Rc::downgrade(&strong));
        drop(inner);
        Subscription {
            guard: Some(Box::new(strong)),
        }
    }

    /// Derive a cell whose value is `f` applied to this cell's value.
    ///
    /// The derived cell is recomputed eagerly on every change of `self` and
    /// stays subscribed for as long as any handle to it is alive.
    pub fn map<U>(&self, f: impl Fn(&T) -> U + 'static) -> Observable<U>
    where
        U: Clone + PartialEq + 'static,
    {
        let derived = Observable::new(self.with(&f));
        let weak = derived.downgrade();
        let sub = self.subscribe(move |value| {
            if let Some(target) = weak.upgrade() {
                target.set(f(value));
            }
        });
        derived.inner.borrow_mut().upstream.push(sub);
        derived
    }

    /// Non-owning handle, for tasks that must not keep the cell alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + 'static> WeakObservable<T> {
    /// Recover a strong handle if the cell is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}
