//! Thread-safe invalidation flags and the typed weak pointers built on top
//! of them.
//!
//! A [`WeakFlag`] is a refcounted boolean that starts valid and can be
//! invalidated exactly once, broadcasting that to every clone. A [`WeakPtr`]
//! pairs a flag with a raw pointer and dereferences to `None` once its flag
//! says so. Two factories hand out weak pointers: [`mixin::WeakPtrFactory`]
//! is meant to be embedded in the target type itself, while
//! [`scoped::ScopedWeakPtrFactory`] is a standalone object with its own
//! invalidation window.

mod flag;
mod inner;
pub mod mixin;
pub mod ptr;
pub mod scoped;

pub use flag::WeakFlag;
pub use mixin::WeakPtrFactory;
pub use ptr::WeakPtr;
pub use scoped::ScopedWeakPtrFactory;
