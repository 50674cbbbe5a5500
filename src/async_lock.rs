//! Cooperative mutex for the `cooperative`-feature variants of the
//! registries and entity pool (spec §4.2's "async variant", §5's
//! suspension points).
//!
//! The sync paths use `parking_lot::Mutex`, which spins briefly then
//! parks the OS thread. That's wrong for a caller already inside a task
//! scheduler: blocking the thread would stall every other task multiplexed
//! onto it. `AsyncLock` instead queues the waiting task's `Waker` and
//! yields `Poll::Pending`, so the executor can run something else until the
//! lock is free.
//!
//! No async runtime is pulled in for this -- there is nothing here that
//! waits on I/O, only on another task finishing a tiny critical section, so
//! a hand-rolled future is enough.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// A mutual-exclusion lock whose `lock()` future yields instead of
/// spinning when contended.
pub struct AsyncLock<T> {
    locked: AtomicBool,
    waiters: Mutex<VecDeque<Waker>>,
    value: std::cell::UnsafeCell<T>,
}

// SAFETY: `value` is only ever accessed through a `Guard` obtained while
// `locked` is held exclusively, the same invariant `std::sync::Mutex`
// relies on to be `Sync`.
unsafe impl<T: Send> Send for AsyncLock<T> {}
unsafe impl<T: Send> Sync for AsyncLock<T> {}

impl<T> AsyncLock<T> {
    pub fn new(value: T) -> Self {
        AsyncLock {
            locked: AtomicBool::new(false),
            waiters: Mutex::new(VecDeque::new()),
            value: std::cell::UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, suspending the calling task while it is held
    /// elsewhere rather than spinning the thread.
    pub fn lock(&self) -> LockFuture<'_, T> {
        LockFuture { lock: self }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn release(&self) {
        self.locked.store(false, Ordering::Release);
        if let Some(waker) = self.waiters.lock().pop_front() {
            waker.wake();
        }
    }
}

/// Future returned by [`AsyncLock::lock`]. Resolves to a [`Guard`] once the
/// lock is acquired.
pub struct LockFuture<'a, T> {
    lock: &'a AsyncLock<T>,
}

impl<'a, T> Future for LockFuture<'a, T> {
    type Output = Guard<'a, T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.lock.try_acquire() {
            return Poll::Ready(Guard { lock: self.lock });
        }
        self.lock.waiters.lock().push_back(cx.waker().clone());
        // Re-check after registering the waker: the lock may have been
        // released between the failed `try_acquire` above and the push.
        if self.lock.try_acquire() {
            return Poll::Ready(Guard { lock: self.lock });
        }
        Poll::Pending
    }
}

/// RAII guard granting exclusive access to the wrapped value; releasing
/// wakes the next queued waiter, if any.
pub struct Guard<'a, T> {
    lock: &'a AsyncLock<T>,
}

impl<'a, T> std::ops::Deref for Guard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<'a, T> std::ops::DerefMut for Guard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<'a, T> Drop for Guard<'a, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
