//! Debug-only assertion that a handle is used on its home thread.

use std::thread::{self, ThreadId};

/// Records the thread it was created on; [`check`](ThreadChecker::check)
/// reports whether the calling thread still matches.
///
/// A thin wrapper over [`std::thread::ThreadId`], which already gives us
/// everything the original hand-rolls `pthread_self()`/`std::thread::id`
/// comparisons for.
pub struct ThreadChecker {
    id: ThreadId,
}

impl ThreadChecker {
    /// Captures the calling thread as this checker's home thread.
    pub fn new() -> Self {
        ThreadChecker {
            id: thread::current().id(),
        }
    }

    /// Returns `true` iff called from the thread that constructed this
    /// checker.
    pub fn check(&self) -> bool {
        thread::current().id() == self.id
    }
}

impl Default for ThreadChecker {
    fn default() -> Self {
        ThreadChecker::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_on_same_thread() {
        let checker = ThreadChecker::new();
        assert!(checker.check());
    }

    #[test]
    fn fails_on_other_thread() {
        let checker = ThreadChecker::new();
        let failed = std::thread::spawn(move || !checker.check())
            .join()
            .unwrap();
        assert!(failed);
    }
}
