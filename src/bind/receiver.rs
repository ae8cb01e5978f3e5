//! Pointer-like receivers recognized by [`super::bind_method`].

use std::sync::Arc;

/// A pointer-like receiver: anything that dereferences to the method's
/// owning type. Implemented for [`RawPtr`] and `Arc`; the original's
/// equivalent accepts any type supporting `operator*`, including
/// `std::unique_ptr`, but every [`Callback`](super::Callback) must be `Send`
/// (see its doc comment), which rules out receivers like `Rc` that are
/// never `Send`.
pub trait Receiver<T: ?Sized>: Send + 'static {
    /// # Safety
    /// The implementation must guarantee the returned reference is valid for
    /// as long as the caller uses it.
    unsafe fn resolve(&self) -> &T;
}

/// A raw pointer receiver, the idiomatic stand-in for the original's
/// unchecked `T*` method receiver.
///
/// Explicitly `Send` (raw pointers aren't, by default) because a bound
/// method call built over one is meant to be posted to a loop that may run
/// on another thread, exactly like the original's bare pointer receiver,
/// which carries no compile-time thread-safety guard either.
pub struct RawPtr<T: ?Sized>(*mut T);

unsafe impl<T: ?Sized> Send for RawPtr<T> {}

impl<T: ?Sized> RawPtr<T> {
    /// # Safety
    /// `ptr` must stay valid, and not be mutated concurrently with any call
    /// through a [`Callback`](super::Callback) built over this receiver,
    /// for as long as such a callback might still run.
    pub unsafe fn new(ptr: *mut T) -> Self {
        RawPtr(ptr)
    }
}

impl<T: ?Sized + 'static> Receiver<T> for RawPtr<T> {
    unsafe fn resolve(&self) -> &T {
        &*self.0
    }
}

impl<T: Send + Sync + 'static> Receiver<T> for Arc<T> {
    unsafe fn resolve(&self) -> &T {
        self
    }
}
