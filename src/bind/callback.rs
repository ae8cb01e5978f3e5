//! The deferred-call value `bind()` produces.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Inner<R> {
    ref_count: AtomicUsize,
    function: Box<dyn Fn() -> R + Send>,
}

/// A copyable, refcounted, deferred call.
///
/// Cloning is cheap: it only bumps a refcount, same as the original's
/// `SharedStorage::Ref`. Unlike [`std::sync::Arc`], the refcount is
/// hand-rolled here rather than delegated to `Arc`, because `Arc<T>` is only
/// `Send` when `T` is *both* `Send` and `Sync` — but a `Callback` built over
/// [`crate::weak::WeakPtr`] (see [`crate::bind::bind_weak_method`]) wraps a
/// closure that is `Send` without being `Sync`. `Callback` itself is `Send`
/// (so it can be posted to a loop running on another thread) but not `Sync`:
/// per the spec, concurrent invocation of distinct clones from different
/// threads is the caller's responsibility, not something this type
/// enforces.
pub struct Callback<R = ()> {
    inner: NonNull<Inner<R>>,
}

unsafe impl<R> Send for Callback<R> {}

impl<R> Callback<R> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn() -> R + Send + 'static,
    {
        let boxed = Box::new(Inner {
            ref_count: AtomicUsize::new(1),
            function: Box::new(f),
        });
        Callback {
            inner: NonNull::new(Box::into_raw(boxed)).unwrap(),
        }
    }

    /// Invokes the wrapped callable.
    pub fn call(&self) -> R {
        (unsafe { self.inner.as_ref() }.function)()
    }
}

impl<R> Clone for Callback<R> {
    fn clone(&self) -> Self {
        unsafe { self.inner.as_ref() }
            .ref_count
            .fetch_add(1, Ordering::Relaxed);
        Callback { inner: self.inner }
    }
}

impl<R> Drop for Callback<R> {
    fn drop(&mut self) {
        let was_last = unsafe { self.inner.as_ref() }
            .ref_count
            .fetch_sub(1, Ordering::AcqRel)
            == 1;
        if was_last {
            unsafe { drop(Box::from_raw(self.inner.as_ptr())) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impls::impls;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn call_invokes_wrapped_closure() {
        let cb = Callback::new(|| 7);
        assert_eq!(cb.call(), 7);
        assert_eq!(cb.call(), 7);
    }

    #[test]
    fn clone_shares_the_same_storage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let cb = Callback::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        let other = cb.clone();

        cb.call();
        other.call();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn drops_storage_after_last_clone() {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());
        let cb = Callback::new(move || {
            let _keep_alive = &guard;
        });
        let other = cb.clone();

        drop(cb);
        assert!(!dropped.load(Ordering::SeqCst));
        drop(other);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn trait_implementations() {
        assert!(impls!(Callback<()>: Send & !Sync & Clone & !Debug));
    }
}
