//! Abstraction over thread-local storage for the loop current on this
//! thread.
//!
//! Can transparently switch between using:
//! - the always-available `thread_local!` macro.
//! - the nightly-only `#[thread_local]` attribute.

use super::event_loop::Shared;
use std::cell::RefCell;
use std::sync::Arc;

/// Cache padded to avoid a potential performance hit due to false sharing.
#[repr(align(128))]
struct Current(RefCell<Option<Arc<Shared>>>);

#[cfg(not(feature = "fast_thread_local"))]
thread_local! {
    /// Each thread gets its own independent "current loop" slot.
    static CURRENT: Current = Current(RefCell::new(None));
}

/// Sets (or clears, with `None`) the loop current on this thread.
#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn set_current(loop_: Option<Arc<Shared>>) {
    CURRENT.with(|cell| *cell.0.borrow_mut() = loop_);
}

/// Returns the loop current on this thread, if any.
#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn current() -> Option<Arc<Shared>> {
    CURRENT.with(|cell| cell.0.borrow().clone())
}

#[cfg(feature = "fast_thread_local")]
#[thread_local]
static CURRENT: Current = Current(RefCell::new(None));

/// Sets (or clears, with `None`) the loop current on this thread.
#[cfg(feature = "fast_thread_local")]
pub(super) fn set_current(loop_: Option<Arc<Shared>>) {
    *CURRENT.0.borrow_mut() = loop_;
}

/// Returns the loop current on this thread, if any.
#[cfg(feature = "fast_thread_local")]
pub(super) fn current() -> Option<Arc<Shared>> {
    CURRENT.0.borrow().clone()
}
