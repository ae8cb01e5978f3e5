//! Scoped weak pointer factory.

use super::inner::Factory;
use super::ptr::WeakPtr;

/// A standalone weak pointer factory holding `(flag, raw_target_ptr)`.
///
/// Identical in contract to [`WeakPtrFactory`](super::mixin::WeakPtrFactory)
/// except it captures the target pointer once, at construction, and is
/// invalidated only when the factory itself is dropped — not tied to the
/// target's lifetime. This lets a target have several independent
/// invalidation scopes, each covering a different span of its lifetime, by
/// holding more than one `ScopedWeakPtrFactory` (commonly inside an
/// `Option`, so one scope can be torn down and a new one started):
///
/// ```ignore
/// struct Request {
///     retry_scope: Option<ScopedWeakPtrFactory<Request>>,
/// }
/// ```
pub struct ScopedWeakPtrFactory<'target, T: ?Sized> {
    inner: Factory,
    target: &'target T,
}

impl<'target, T: ?Sized> ScopedWeakPtrFactory<'target, T> {
    /// Creates a factory scoped to `target`, which must outlive every
    /// [`WeakPtr`] handed out by this factory that is still valid.
    pub fn new(target: &'target T) -> Self {
        ScopedWeakPtrFactory {
            inner: Factory::new(),
            target,
        }
    }

    /// Returns a new weak pointer to the target, allocating a flag on first
    /// use (or after the last [`invalidate_all`](ScopedWeakPtrFactory::invalidate_all)).
    pub fn get_weak_ptr(&self) -> WeakPtr<T> {
        self.inner.get_weak_ptr(self.target as *const T)
    }

    /// Returns whether any weak pointer handed out by this factory is still
    /// outstanding and valid.
    pub fn has_weak_ptrs(&self) -> bool {
        self.inner.has_weak_ptrs()
    }

    /// Invalidates every weak pointer this factory has handed out so far.
    pub fn invalidate_all(&mut self) {
        self.inner.invalidate_all();
    }
}

impl<'target, T: ?Sized> Drop for ScopedWeakPtrFactory<'target, T> {
    fn drop(&mut self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Target {
        value: i32,
    }

    #[test]
    fn weak_ptr_survives_factory_drop_only() {
        let target = Target { value: 7 };
        let mut scope_a = ScopedWeakPtrFactory::new(&target);
        let weak_a = scope_a.get_weak_ptr();

        drop(scope_a);
        assert!(weak_a.get().is_none());
    }

    #[test]
    fn independent_scopes_for_one_target() {
        let target = Target { value: 7 };
        let mut scope_a = ScopedWeakPtrFactory::new(&target);
        let scope_b = ScopedWeakPtrFactory::new(&target);

        let weak_a = scope_a.get_weak_ptr();
        let weak_b = scope_b.get_weak_ptr();

        scope_a.invalidate_all();

        assert!(weak_a.get().is_none());
        assert_eq!(weak_b.get().unwrap().value, 7);
    }

    #[test]
    fn has_weak_ptrs_reflects_outstanding_handles() {
        let target = Target { value: 7 };
        let factory = ScopedWeakPtrFactory::new(&target);
        assert!(!factory.has_weak_ptrs());

        let weak = factory.get_weak_ptr();
        assert!(factory.has_weak_ptrs());
        drop(weak);
    }
}
