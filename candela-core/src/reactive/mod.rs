//! Single-threaded reactive cells.
//!
//! - [`Observable`]: a shared, version-tracked value with synchronous change
//!   notification.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! Dependencies are explicit: a derived cell or an effect names the cells it
//! reads. There is no automatic read tracking.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation: every `set` that changes
//!    the value and every `push`.
//! 2. Setting a value equal to the current value is a no-op; pushing it is not.
//! 3. Subscribers run synchronously, in registration order, inside `set` or
//!    `push`.
//! 4. No borrow of the cell is held while subscribers run, so a subscriber may
//!    read or write any cell.
//! 5. If a subscriber writes the cell that is notifying it, the outer
//!    notification stops and the remaining subscribers only see the newer value.

/// The [`Observable`] cell and its handles.
pub mod observable;

pub use observable::{Observable, Subscription, WeakObservable};
