//! Mixin-style weak pointer factory.

use super::inner::Factory;
use super::ptr::WeakPtr;

/// Grants a type a `get_weak_ptr` method by embedding this as a field.
///
/// Lazily allocates a [`WeakFlag`](super::WeakFlag) on first use; invalidates
/// it when dropped. Meant to be embedded exactly once per target, typically
/// as the struct's *last* declared field, since Rust drops fields in
/// declaration order and the original's base-class mixin invalidates only
/// after its derived members have already been torn down:
///
/// ```ignore
/// struct Worker {
///     state: State,
///     weak_factory: WeakPtrFactory<Worker>,
/// }
///
/// impl Worker {
///     fn weak_ptr(&self) -> WeakPtr<Worker> {
///         self.weak_factory.get_weak_ptr(self)
///     }
/// }
/// ```
///
/// Unlike the original's CRTP-derived `this`, the target pointer is supplied
/// at each call to [`get_weak_ptr`](WeakPtrFactory::get_weak_ptr) rather than
/// captured at construction, since a field can't observe its own owner's
/// address before the owner exists. After
/// [`invalidate_all`](WeakPtrFactory::invalidate_all), the next call
/// allocates a fresh, valid flag — useful when an object is re-armed for
/// another round of asynchronous work.
pub struct WeakPtrFactory<T: ?Sized>(Factory, std::marker::PhantomData<fn(&T)>);

impl<T: ?Sized> Default for WeakPtrFactory<T> {
    fn default() -> Self {
        WeakPtrFactory::new()
    }
}

impl<T: ?Sized> WeakPtrFactory<T> {
    /// Creates an empty factory; no flag is allocated until the first
    /// [`get_weak_ptr`](WeakPtrFactory::get_weak_ptr) call.
    pub fn new() -> Self {
        WeakPtrFactory(Factory::new(), std::marker::PhantomData)
    }

    /// Returns a new weak pointer to `target`, allocating a flag on first use
    /// (or after the last [`invalidate_all`](WeakPtrFactory::invalidate_all)).
    pub fn get_weak_ptr(&self, target: &T) -> WeakPtr<T> {
        self.0.get_weak_ptr(target as *const T)
    }

    /// Returns whether any weak pointer handed out by this factory is still
    /// outstanding and valid.
    pub fn has_weak_ptrs(&self) -> bool {
        self.0.has_weak_ptrs()
    }

    /// Invalidates every weak pointer this factory has handed out so far.
    pub fn invalidate_all(&mut self) {
        self.0.invalidate_all();
    }
}

impl<T: ?Sized> Drop for WeakPtrFactory<T> {
    fn drop(&mut self) {
        self.0.invalidate_all();
    }
}
