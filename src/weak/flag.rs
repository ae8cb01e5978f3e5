//! Shared, thread-safe invalidation flag.

use crate::thread_checker::ThreadChecker;
use std::sync::{Arc, Mutex};

struct Shared {
    valid: Mutex<bool>,
    checker: ThreadChecker,
}

impl Shared {
    fn new(valid: bool) -> Self {
        Shared {
            valid: Mutex::new(valid),
            checker: ThreadChecker::new(),
        }
    }
}

/// A refcounted flag that can be invalidated. Clones share the same flag:
/// once invalidated, every clone observes it. `Arc`'s strong count stands in
/// for the hand-rolled refcount the original keeps alongside `valid` in its
/// `Shared` record.
///
/// Can be cloned and moved across threads, but [`WeakFlag::is_valid`],
/// [`WeakFlag::is_sharing`] and [`WeakFlag::invalidate_all`] must be called
/// from the thread that first touched this flag's record (asserted in debug
/// builds via [`ThreadChecker`]).
#[derive(Clone)]
pub struct WeakFlag {
    shared: Arc<Shared>,
}

impl WeakFlag {
    /// Creates a new, valid flag with no other clones.
    pub fn new() -> Self {
        WeakFlag {
            shared: Arc::new(Shared::new(true)),
        }
    }

    /// Returns whether the flag is still valid.
    pub fn is_valid(&self) -> bool {
        debug_assert!(self.shared.checker.check());
        *self.shared.valid.lock().unwrap()
    }

    /// Returns whether another clone of this flag exists and the flag is
    /// still valid.
    pub fn is_sharing(&self) -> bool {
        debug_assert!(self.shared.checker.check());
        *self.shared.valid.lock().unwrap() && Arc::strong_count(&self.shared) > 1
    }

    /// Invalidates this flag and every clone sharing its record.
    pub fn invalidate_all(&self) {
        debug_assert!(self.shared.checker.check());
        *self.shared.valid.lock().unwrap() = false;
    }

    /// Detaches this flag from its current record and attaches it to a
    /// fresh, already-invalid record. Clones that were sharing the old
    /// record are unaffected and keep reporting whatever validity they had.
    pub fn reset(&mut self) {
        self.shared = Arc::new(Shared::new(false));
    }
}

impl Default for WeakFlag {
    fn default() -> Self {
        WeakFlag::new()
    }
}

impl std::fmt::Debug for WeakFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakFlag")
            .field("valid", &*self.shared.valid.lock().unwrap())
            .field("shares", &Arc::strong_count(&self.shared))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impls::impls;

    #[test]
    fn new_flag_is_valid() {
        let flag = WeakFlag::new();
        assert!(flag.is_valid());
        assert!(!flag.is_sharing());
    }

    #[test]
    fn clone_shares_validity() {
        let flag = WeakFlag::new();
        let clone = flag.clone();

        assert!(flag.is_sharing());
        assert!(clone.is_sharing());

        flag.invalidate_all();

        assert!(!flag.is_valid());
        assert!(!clone.is_valid());
    }

    #[test]
    fn reset_detaches_without_affecting_other_clones() {
        let flag = WeakFlag::new();
        let mut other = flag.clone();

        other.reset();

        assert!(!other.is_valid());
        assert!(flag.is_valid());
        assert!(!flag.is_sharing());
    }

    #[test]
    fn reset_twice_is_idempotent() {
        let mut flag = WeakFlag::new();
        flag.reset();
        assert!(!flag.is_valid());
        flag.reset();
        assert!(!flag.is_valid());
    }

    #[test]
    fn trait_implementations() {
        assert!(impls!(WeakFlag: Send & Sync & Clone & !Copy));
    }
}
