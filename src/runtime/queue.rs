//! Task records and the pending-queues container guarded by one mutex,
//! per the concurrency model: a single lock covers the immediate vector,
//! the delayed heap and the poll vector together, held only long enough to
//! enqueue, swap out, or decide whether to ping.

use crate::bind::PollCallback;
use crate::time::Instant;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::os::unix::io::RawFd;

pub(crate) type BoxedTask = Box<dyn FnOnce() + Send>;

/// An immediately-runnable task: a deferred call with no further arguments.
/// Executes at most once, so it's an `FnOnce`, not the copyable [`Callback`]
/// (`bind()` itself, or a plain closure, both convert trivially).
///
/// [`Callback`]: crate::bind::Callback
pub(crate) struct ImmediateTask {
    pub task: BoxedTask,
}

/// A task scheduled to become immediate once `due_at` has passed.
///
/// Ordered by `due_at` ascending with ties broken by insertion order (the
/// spec's deliberate sharpening of the source's unspecified tie-break); the
/// comparison is reversed so [`BinaryHeap`], a max-heap, surfaces the
/// earliest-due task first.
pub(crate) struct DelayedTask {
    pub task: BoxedTask,
    pub due_at: Instant,
    pub sequence: u64,
}

impl PartialEq for DelayedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.sequence == other.sequence
    }
}

impl Eq for DelayedTask {}

impl PartialOrd for DelayedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// The readiness interest a poll task was registered for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Interest {
    Read,
    Write,
}

/// A request queued against the poll vector: register a new fd, or cancel
/// an existing registration. Mirrors the original's convention of encoding
/// "cancel" as a `PollTask` with zero `events` rather than a separate type,
/// except spelled out as an enum instead of a sentinel.
pub(crate) enum PendingPoll {
    Register {
        fd: RawFd,
        interest: Interest,
        callback: PollCallback,
    },
    Cancel {
        fd: RawFd,
    },
}

impl PendingPoll {
    pub(crate) fn fd(&self) -> RawFd {
        match self {
            PendingPoll::Register { fd, .. } => *fd,
            PendingPoll::Cancel { fd } => *fd,
        }
    }
}

/// A poll task that has been applied to the wait array and is awaiting
/// readiness.
pub(crate) struct RegisteredPoll {
    pub fd: RawFd,
    pub interest: Interest,
    pub callback: PollCallback,
}

/// The three pending queues, meant to be held behind a single mutex.
pub(crate) struct Pending {
    pub immediate: Vec<ImmediateTask>,
    pub delayed: BinaryHeap<DelayedTask>,
    pub poll: Vec<PendingPoll>,
}

impl Pending {
    pub(crate) fn new() -> Self {
        Pending {
            immediate: Vec::new(),
            delayed: BinaryHeap::new(),
            poll: Vec::new(),
        }
    }

    /// Moves every delayed task whose `due_at <= now` into `immediate`.
    /// Returns the number of milliseconds until the next remaining delayed
    /// task, if any.
    pub(crate) fn promote_due(&mut self, now: Instant) -> Option<i32> {
        while let Some(top) = self.delayed.peek() {
            if top.due_at > now {
                break;
            }
            let due = self.delayed.pop().unwrap();
            self.immediate.push(ImmediateTask { task: due.task });
        }
        self.delayed
            .peek()
            .map(|next| crate::time::millis_until(next.due_at, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(due_at: Instant, sequence: u64) -> DelayedTask {
        DelayedTask {
            task: Box::new(|| ()),
            due_at,
            sequence,
        }
    }

    #[test]
    fn heap_pops_earliest_due_at_first() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(task(base + std::time::Duration::from_millis(30), 0));
        heap.push(task(base + std::time::Duration::from_millis(10), 1));
        heap.push(task(base + std::time::Duration::from_millis(20), 2));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|t| t.sequence)
            .collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(task(base, 5));
        heap.push(task(base, 2));
        heap.push(task(base, 9));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|t| t.sequence)
            .collect();
        assert_eq!(order, vec![2, 5, 9]);
    }

    #[test]
    fn promote_due_moves_only_due_tasks() {
        let base = Instant::now();
        let mut pending = Pending::new();
        pending.delayed.push(task(base, 0));
        pending
            .delayed
            .push(task(base + std::time::Duration::from_millis(50), 1));

        let next_timeout = pending.promote_due(base);

        assert_eq!(pending.immediate.len(), 1);
        assert_eq!(pending.delayed.len(), 1);
        assert_eq!(next_timeout, Some(50));
    }
}
