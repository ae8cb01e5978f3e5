//! Monotonic time, with a test-injectable override.

use std::sync::Mutex;

/// The runtime's notion of a monotonic time-point.
pub type Instant = std::time::Instant;

type NowFn = Box<dyn Fn() -> Instant + Send + Sync>;

static OVERRIDE: Mutex<Option<NowFn>> = Mutex::new(None);

/// Returns the current monotonic time.
///
/// Returns the platform's monotonic clock, unless a function was installed
/// with [`set_now_fn`], in which case that function's result is returned
/// instead. Never goes backward (assuming the installed override doesn't
/// either).
pub fn now() -> Instant {
    let guard = OVERRIDE.lock().unwrap();
    match guard.as_ref() {
        Some(f) => f(),
        None => Instant::now(),
    }
}

/// Installs a process-global override for [`now`].
///
/// Intended for tests that need to control the passage of time
/// deterministically (see `spec.md` §8, scenario 2). The override is
/// process-wide: install it before any [`crate::runtime::EventLoop`] is
/// running, since a loop may read `now()` from any thread that posts delayed
/// work to it.
pub fn set_now_fn<F>(f: F)
where
    F: Fn() -> Instant + Send + Sync + 'static,
{
    *OVERRIDE.lock().unwrap() = Some(Box::new(f));
}

/// Removes any override installed by [`set_now_fn`], reverting to the
/// platform's monotonic clock. Mostly useful to keep tests from leaking
/// their mock clock into unrelated tests in the same process.
pub fn clear_now_fn() {
    *OVERRIDE.lock().unwrap() = None;
}

/// Converts a deadline relative to `from` into whole milliseconds, rounding
/// up so a not-yet-due delayed task is never observed as due early because
/// of truncation.
pub(crate) fn millis_until(deadline: Instant, from: Instant) -> i32 {
    if deadline <= from {
        return 0;
    }
    let d = deadline - from;
    let millis = d.as_millis().min(i32::MAX as u128) as i32;
    if d.subsec_nanos() % 1_000_000 != 0 {
        millis.saturating_add(1)
    } else {
        millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_to_platform_clock() {
        clear_now_fn();
        let before = std::time::Instant::now();
        let reported = now();
        let after = std::time::Instant::now();
        assert!(before <= reported && reported <= after);
    }

    #[test]
    fn override_is_used_when_installed() {
        let fixed = Instant::now();
        set_now_fn(move || fixed);

        assert_eq!(now(), fixed);
        assert_eq!(now(), fixed);

        clear_now_fn();
    }

    #[test]
    fn millis_until_is_zero_when_due() {
        let t = Instant::now();
        assert_eq!(millis_until(t, t), 0);
        assert_eq!(millis_until(t, t + Duration::from_millis(5)), 0);
    }

    #[test]
    fn millis_until_rounds_up() {
        let t = Instant::now();
        assert_eq!(millis_until(t + Duration::from_millis(10), t), 10);
    }
}
