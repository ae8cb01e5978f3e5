//! The single-threaded cooperative event loop.
//!
//! One thread at a time runs a loop via [`EventLoop::run`], which repeatedly
//! drains whatever immediate work is pending, promotes due delayed tasks,
//! applies poll registration changes, and otherwise blocks in `poll(2)` until
//! more work shows up, some delayed task becomes due, or a watched descriptor
//! turns ready. Other threads (or callbacks running on the loop's own
//! thread) hand it work by cloning the handle and calling `post*`; a
//! self-pipe wakes the `poll(2)` call whenever cross-thread work arrives
//! while it's blocked.

use crate::bind::PollCallback;
use crate::error::{Error, Result};
use crate::runtime::queue::{DelayedTask, ImmediateTask, Interest, Pending, PendingPoll, RegisteredPoll};
use crate::runtime::tls;
use crate::time;
use log::{debug, error, warn};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// State shared by every clone of an [`EventLoop`] handle.
pub(crate) struct Shared {
    pending: Mutex<Pending>,
    pipe_read: RawFd,
    pipe_write: RawFd,
    quit_soon: AtomicBool,
    next_sequence: AtomicU64,
    running: AtomicBool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap();
        if !pending.immediate.is_empty() {
            error!(
                "EventLoop dropped with {} immediate task(s) still pending; they will not run",
                pending.immediate.len()
            );
        }
        let still_watching = pending
            .poll
            .iter()
            .filter(|p| matches!(p, PendingPoll::Register { .. }))
            .count();
        if still_watching > 0 {
            error!(
                "EventLoop dropped with {still_watching} poll registration(s) still pending; they will not run"
            );
        }
        // Delayed tasks are released silently: a loop that never got around
        // to a timer isn't a sign of a leak the way undelivered immediate or
        // poll work is.

        unsafe {
            libc::close(self.pipe_read);
            libc::close(self.pipe_write);
        }
    }
}

/// A cheaply-cloneable handle to a single-threaded event loop.
///
/// Only one thread may call [`run`](EventLoop::run) on a given loop at a
/// time, but any thread holding a clone may call the `post*` family, which
/// is how work crosses from other threads onto the loop's own thread.
#[derive(Clone)]
pub struct EventLoop {
    shared: Arc<Shared>,
}

impl EventLoop {
    /// Creates a new, not-yet-running loop, allocating its self-pipe.
    pub fn new() -> Result<Self> {
        let mut fds = [0; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            let err = io::Error::last_os_error();
            error!("failed to create event loop self-pipe: {err}");
            return Err(Error::CreatePipe(err));
        }
        let (pipe_read, pipe_write) = (fds[0], fds[1]);

        let flags = unsafe { libc::fcntl(pipe_read, libc::F_GETFL, 0) };
        if flags == -1 || unsafe { libc::fcntl(pipe_read, libc::F_SETFL, flags | libc::O_NONBLOCK) } == -1 {
            let err = io::Error::last_os_error();
            error!("failed to set event loop self-pipe non-blocking: {err}");
            unsafe {
                libc::close(pipe_read);
                libc::close(pipe_write);
            }
            return Err(Error::SetNonBlocking(err));
        }

        Ok(EventLoop {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending::new()),
                pipe_read,
                pipe_write,
                quit_soon: AtomicBool::new(false),
                next_sequence: AtomicU64::new(0),
                running: AtomicBool::new(false),
            }),
        })
    }

    /// Returns the loop currently running on this thread, if any.
    pub fn current() -> Option<EventLoop> {
        tls::current().map(|shared| EventLoop { shared })
    }

    /// Whether this handle refers to the loop currently running on this
    /// thread.
    pub fn is_current(&self) -> bool {
        tls::current().is_some_and(|c| Arc::ptr_eq(&c, &self.shared))
    }

    /// Queues `task` to run as soon as the loop next drains its immediate
    /// queue. Safe to call from any thread.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.shared.pending.lock().unwrap();
        let should_ping = pending.immediate.is_empty();
        pending.immediate.push(ImmediateTask { task: Box::new(task) });
        drop(pending);
        if should_ping {
            self.ping();
        }
    }

    /// Queues `task` to run once `delay` has elapsed. Safe to call from any
    /// thread.
    pub fn post_after<F>(&self, task: F, delay: Duration)
    where
        F: FnOnce() + Send + 'static,
    {
        let due_at = time::now() + delay;
        let sequence = self.shared.next_sequence.fetch_add(1, Ordering::Relaxed);

        let mut pending = self.shared.pending.lock().unwrap();
        let should_ping = pending.delayed.peek().is_none_or(|earliest| due_at < earliest.due_at);
        pending.delayed.push(DelayedTask {
            task: Box::new(task),
            due_at,
            sequence,
        });
        drop(pending);
        if should_ping {
            self.ping();
        }
    }

    /// Registers `callback` to run once `fd` is readable (or hangs up, or
    /// errors). Safe to call from any thread.
    pub fn post_when_read_ready<F>(&self, fd: RawFd, callback: F)
    where
        F: FnOnce(bool, bool, bool) + Send + 'static,
    {
        self.register_poll(fd, Interest::Read, PollCallback::new(callback));
    }

    /// Registers `callback` to run once `fd` is writable (or hangs up, or
    /// errors). Safe to call from any thread.
    pub fn post_when_write_ready<F>(&self, fd: RawFd, callback: F)
    where
        F: FnOnce(bool, bool, bool) + Send + 'static,
    {
        self.register_poll(fd, Interest::Write, PollCallback::new(callback));
    }

    fn register_poll(&self, fd: RawFd, interest: Interest, callback: PollCallback) {
        let mut pending = self.shared.pending.lock().unwrap();
        pending.poll.push(PendingPoll::Register { fd, interest, callback });
        drop(pending);
        self.ping();
    }

    /// Cancels any pending or already-registered poll task for `fd` without
    /// invoking its callback. Safe to call from any thread.
    pub fn cancel_descriptor(&self, fd: RawFd) {
        let mut pending = self.shared.pending.lock().unwrap();
        pending.poll.push(PendingPoll::Cancel { fd });
        drop(pending);
        self.ping();
    }

    /// Sugar for posting a task that drops `Box::from_raw(ptr)`.
    ///
    /// # Safety
    /// `ptr` must have come from `Box::into_raw` and not already be freed,
    /// and nothing else may use it after this call.
    pub unsafe fn delete_soon<T: 'static>(&self, ptr: *mut T) {
        struct SendPtr<T>(*mut T);
        unsafe impl<T> Send for SendPtr<T> {}
        let ptr = SendPtr(ptr);
        self.post(move || drop(unsafe { Box::from_raw(ptr.0) }));
    }

    /// Requests that [`run`](EventLoop::run) return once the current
    /// iteration's immediate work has been drained. Safe to call from any
    /// thread, including from within a task running on the loop itself.
    pub fn quit_soon(&self) {
        self.shared.quit_soon.store(true, Ordering::SeqCst);
        self.ping();
    }

    /// Wakes a `poll(2)` call blocked on this loop's self-pipe.
    fn ping(&self) {
        let byte: u8 = 0;
        let written = unsafe { libc::write(self.shared.pipe_write, &byte as *const u8 as *const _, 1) };
        if written != 1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                // The pipe is already full of pending wake-ups; the reader
                // will drain them and see the work regardless.
                return;
            }
            error!("writing to event loop self-pipe failed: {err}");
            panic!("event loop self-pipe write failed: {err}");
        }
    }

    /// Runs the loop on the calling thread until [`quit_soon`](EventLoop::quit_soon)
    /// is called (by any thread) and the current iteration's immediate work
    /// has drained.
    ///
    /// # Panics
    /// In debug builds, panics if another loop is already current on this
    /// thread, or if this loop is already running (on any thread).
    pub fn run(&self) {
        debug_assert!(
            tls::current().is_none(),
            "EventLoop::run called while a different loop is already current on this thread"
        );
        let already_running = self.shared.running.swap(true, Ordering::SeqCst);
        debug_assert!(
            !already_running,
            "EventLoop::run called while this loop is already running on another thread"
        );

        tls::set_current(Some(self.shared.clone()));

        let mut wait_array = vec![libc::pollfd {
            fd: self.shared.pipe_read,
            events: libc::POLLIN,
            revents: 0,
        }];
        let mut registered: Vec<RegisteredPoll> = Vec::new();
        let mut read_buf = [0u8; 1024];

        'run: loop {
            let mut did_work;
            let mut next_timeout: Option<i32> = None;

            loop {
                drain_self_pipe(self.shared.pipe_read, &mut read_buf);

                let now = time::now();
                let (immediate, poll_requests) = {
                    let mut pending = self.shared.pending.lock().unwrap();
                    next_timeout = pending.promote_due(now);
                    let immediate = std::mem::take(&mut pending.immediate);
                    let poll_requests = std::mem::take(&mut pending.poll);
                    (immediate, poll_requests)
                };

                for request in poll_requests {
                    apply_poll_request(&mut wait_array, &mut registered, request);
                }

                did_work = !immediate.is_empty();
                debug!("event loop running {} immediate task(s)", immediate.len());
                for task in immediate {
                    (task.task)();
                }

                if !did_work {
                    break;
                }
            }

            if self.shared.quit_soon.swap(false, Ordering::SeqCst) {
                break 'run;
            }

            debug!(
                "event loop blocking in poll() for {:?}ms across {} fd(s)",
                next_timeout,
                wait_array.len()
            );
            let timeout_ms = next_timeout.unwrap_or(-1);
            let ready = unsafe { libc::poll(wait_array.as_mut_ptr(), wait_array.len() as libc::nfds_t, timeout_ms) };
            if ready == -1 {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::WouldBlock {
                    error!("event loop poll() failed: {err}");
                    panic!("event loop poll() failed: {err}");
                }
            }

            let mut i = 1;
            while i < wait_array.len() {
                let entry = wait_array[i];
                let watched = match registered[i - 1].interest {
                    Interest::Read => libc::POLLIN,
                    Interest::Write => libc::POLLOUT,
                };
                if entry.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL | watched) != 0 {
                    let revents = entry.revents;
                    wait_array.swap_remove(i);
                    let ready = registered.swap_remove(i - 1);
                    ready.callback.call(
                        revents & libc::POLLNVAL != 0,
                        revents & libc::POLLHUP != 0,
                        revents & libc::POLLERR != 0,
                    );
                } else {
                    i += 1;
                }
            }
        }

        if !registered.is_empty() {
            warn!(
                "EventLoop::run returning with {} poll registration(s) still outstanding; re-queued for the next run()",
                registered.len()
            );
            let mut pending = self.shared.pending.lock().unwrap();
            for ready in registered.drain(..) {
                pending.poll.push(PendingPoll::Register {
                    fd: ready.fd,
                    interest: ready.interest,
                    callback: ready.callback,
                });
            }
        }

        tls::set_current(None);
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

fn drain_self_pipe(pipe_read: RawFd, buf: &mut [u8]) {
    loop {
        let n = unsafe { libc::read(pipe_read, buf.as_mut_ptr() as *mut _, buf.len()) };
        if n > 0 {
            continue;
        }
        if n == 0 {
            error!("event loop self-pipe read end reached EOF");
            panic!("event loop self-pipe closed unexpectedly");
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::WouldBlock {
            error!("reading from event loop self-pipe failed: {err}");
            panic!("event loop self-pipe read failed: {err}");
        }
        break;
    }
}

fn apply_poll_request(wait_array: &mut Vec<libc::pollfd>, registered: &mut Vec<RegisteredPoll>, request: PendingPoll) {
    match request {
        PendingPoll::Register { fd, interest, callback } => {
            if let Some(pos) = registered.iter().position(|r| r.fd == fd) {
                debug_assert!(
                    false,
                    "fd {fd} registered for poll readiness while already registered; replacing the earlier registration"
                );
                let wait_pos = wait_array.iter().position(|p| p.fd == fd).unwrap();
                wait_array.swap_remove(wait_pos);
                registered.swap_remove(pos);
            }
            let events = match interest {
                Interest::Read => libc::POLLIN,
                Interest::Write => libc::POLLOUT,
            };
            wait_array.push(libc::pollfd { fd, events, revents: 0 });
            registered.push(RegisteredPoll { fd, interest, callback });
        }
        PendingPoll::Cancel { fd } => {
            if let Some(wait_pos) = wait_array.iter().position(|p| p.fd == fd) {
                wait_array.swap_remove(wait_pos);
                registered.swap_remove(wait_pos - 1);
            }
        }
    }
}
