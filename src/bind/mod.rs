//! Packages a callable together with a prefix of its arguments into a
//! copyable, refcounted, deferred call.
//!
//! Rust has no variadic templates, so instead of one `Bind()` overloaded on
//! every argument count, the trailing-argument arity is fixed to the two
//! shapes this crate actually needs: zero trailing arguments (ordinary
//! tasks, see [`Callback`]) and the three booleans a poll callback decodes
//! from `revents` (see [`PollCallback`]). Bound arguments themselves are
//! simply captured by the closures these functions build, which is the
//! idiomatic Rust substitute for the original's `std::tuple<BoundArgs...>`.
//!
//! Three callable shapes are recognized, matching the original's
//! `UnpackTuple<0>` specializations:
//! 1. [`bind`] — a free function or closure.
//! 2. [`bind_method`] — a method with a pointer-like receiver ([`Receiver`]).
//! 3. [`bind_weak_method`] — a method whose receiver is a
//!    [`crate::weak::WeakPtr`]; invocation silently no-ops once the target
//!    has been invalidated. This is the integration point between the
//!    weak-handle system and the binder.

mod callback;
mod poll_callback;
mod receiver;

pub use callback::Callback;
pub use poll_callback::PollCallback;
pub use receiver::{RawPtr, Receiver};

use crate::weak::WeakPtr;

/// Binds a free function or closure, shape 1.
pub fn bind<F, R>(f: F) -> Callback<R>
where
    F: Fn() -> R + Send + 'static,
    R: 'static,
{
    Callback::new(f)
}

/// Binds a method to a pointer-like receiver, shape 2. The call always goes
/// through; the receiver is assumed dereferenceable for as long as the
/// returned [`Callback`] might still run.
pub fn bind_method<P, C, F, R>(method: F, receiver: P) -> Callback<R>
where
    P: Receiver<C>,
    C: 'static,
    F: Fn(&C) -> R + Send + 'static,
    R: 'static,
{
    Callback::new(move || method(unsafe { receiver.resolve() }))
}

/// Binds a void-returning method to a [`WeakPtr`] receiver, shape 3.
/// Invoking the returned [`Callback`] after the target's factory has
/// invalidated the pointer is a silent no-op.
pub fn bind_weak_method<C, F>(method: F, receiver: WeakPtr<C>) -> Callback<()>
where
    C: Send + 'static,
    F: Fn(&C) + Send + 'static,
{
    Callback::new(move || {
        if let Some(target) = receiver.get() {
            method(target);
        }
    })
}

/// Binds a poll-ready method (taking `(invalid, hangup, error)`) to a
/// [`WeakPtr`] receiver. The weak-method counterpart of shape 3 for
/// [`crate::runtime::event_loop::EventLoop::post_when_read_ready`] and
/// [`post_when_write_ready`](crate::runtime::event_loop::EventLoop::post_when_write_ready).
pub fn bind_weak_poll_method<C, F>(method: F, receiver: WeakPtr<C>) -> PollCallback
where
    C: Send + 'static,
    F: Fn(&C, bool, bool, bool) + Send + 'static,
{
    PollCallback::new(move |invalid, hangup, error| {
        if let Some(target) = receiver.get() {
            method(target, invalid, hangup, error);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weak::WeakPtrFactory;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn bind_free_function() {
        fn triple(x: i32) -> i32 {
            x * 3
        }
        let cb = bind(move || triple(4));
        assert_eq!(cb.call(), 12);
    }

    struct Counter {
        value: AtomicI32,
    }

    impl Counter {
        fn increment(&self) {
            self.value.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bind_method_through_arc_receiver() {
        let counter = Arc::new(Counter {
            value: AtomicI32::new(0),
        });
        let cb = bind_method(|c: &Counter| c.increment(), counter.clone());

        cb.call();
        cb.clone().call();

        assert_eq!(counter.value.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bind_method_through_raw_ptr_receiver() {
        let mut counter = Counter {
            value: AtomicI32::new(0),
        };
        let ptr = unsafe { RawPtr::new(&mut counter as *mut Counter) };
        let cb = bind_method(|c: &Counter| c.increment(), ptr);

        cb.call();

        assert_eq!(counter.value.load(Ordering::SeqCst), 1);
    }

    struct Target {
        weak_factory: WeakPtrFactory<Target>,
        value: AtomicI32,
    }

    impl Target {
        fn new() -> Self {
            Target {
                weak_factory: WeakPtrFactory::new(),
                value: AtomicI32::new(0),
            }
        }

        fn increment(&self) {
            self.value.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bind_weak_method_runs_while_valid() {
        let target = Target::new();
        let weak = target.weak_factory.get_weak_ptr(&target);
        let cb = bind_weak_method(Target::increment, weak);

        cb.call();

        assert_eq!(target.value.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bind_weak_method_is_noop_after_invalidation() {
        let mut target = Target::new();
        let weak = target.weak_factory.get_weak_ptr(&target);
        let cb = bind_weak_method(Target::increment, weak);

        target.weak_factory.invalidate_all();
        cb.call();

        assert_eq!(target.value.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bind_weak_poll_method_decodes_revents() {
        let target = Target::new();
        let weak = target.weak_factory.get_weak_ptr(&target);
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_clone = seen.clone();

        let cb = bind_weak_poll_method(
            move |_t: &Target, invalid, hangup, error| {
                *seen_clone.lock().unwrap() = Some((invalid, hangup, error));
            },
            weak,
        );

        cb.call(false, true, false);

        assert_eq!(*seen.lock().unwrap(), Some((false, true, false)));
    }
}
