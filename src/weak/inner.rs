//! Shared logic behind [`super::mixin::WeakPtrFactory`] and
//! [`super::scoped::ScopedWeakPtrFactory`]. Both lazily allocate a flag on
//! first use and invalidate it when dropped; they differ in how they obtain
//! the target pointer (see each module's doc comment).

use super::flag::WeakFlag;
use super::ptr::WeakPtr;
use std::sync::Mutex;

pub(super) struct Factory {
    flag: Mutex<Option<WeakFlag>>,
}

impl Factory {
    pub(super) fn new() -> Self {
        Factory {
            flag: Mutex::new(None),
        }
    }

    pub(super) fn get_weak_ptr<T: ?Sized>(&self, target: *const T) -> WeakPtr<T> {
        let mut guard = self.flag.lock().unwrap();
        let flag = guard.get_or_insert_with(WeakFlag::new).clone();
        WeakPtr::new(flag, target as *mut T)
    }

    pub(super) fn has_weak_ptrs(&self) -> bool {
        match &*self.flag.lock().unwrap() {
            Some(flag) => flag.is_sharing(),
            None => false,
        }
    }

    pub(super) fn invalidate_all(&self) {
        if let Some(flag) = self.flag.lock().unwrap().take() {
            flag.invalidate_all();
        }
    }
}
