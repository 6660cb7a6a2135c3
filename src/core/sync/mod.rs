//! Lock and condition variable the blocking queue is built from.
//!
//! Both wrap `parking_lot`: there is no lock poisoning, so a panic in one
//! thread while holding the lock never turns later queue calls into errors.

use crate::core::clock::Deadline;
use parking_lot::{Condvar, Mutex as RawMutex};

pub use parking_lot::MutexGuard;

/// Exclusive, non-recursive lock.
///
/// Locking it again from the thread that already holds it deadlocks.
#[derive(Debug, Default)]
pub struct Mutex<T> {
    inner: RawMutex<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Self { inner: RawMutex::new(value) }
    }

    /// Block until the lock is acquired; it is released when the guard drops
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Acquire the lock only if nobody holds it right now
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock()
    }

    /// Exclusive access without locking, possible only through `&mut self`
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Condition variable paired with one [`Mutex`].
///
/// Every wait may return spuriously, and a wakeup may find that another
/// thread already consumed the state change it announced. Callers always
/// recheck their predicate in a loop, or use [`ConditionVariable::wait_while`].
///
/// A condition variable must only ever be used with a single mutex.
#[derive(Debug, Default)]
pub struct ConditionVariable {
    inner: Condvar,
}

impl ConditionVariable {
    pub fn new() -> Self {
        Self { inner: Condvar::new() }
    }

    /// Release the lock, sleep until woken, reacquire the lock
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.inner.wait(guard);
    }

    /// Like [`wait`](Self::wait), bounded by `deadline`.
    ///
    /// Returns `false` when the deadline passed, `true` on a wakeup (possibly
    /// spurious) before it. The predicate must be rechecked either way.
    pub fn wait_until<T>(&self, guard: &mut MutexGuard<'_, T>, deadline: Deadline) -> bool {
        !self.inner.wait_until(guard, deadline.instant()).timed_out()
    }

    /// Wait for as long as `condition` holds
    pub fn wait_while<T, F>(&self, guard: &mut MutexGuard<'_, T>, mut condition: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut **guard) {
            self.inner.wait(guard);
        }
    }

    /// Wait for as long as `condition` holds, giving up at `deadline`.
    ///
    /// Returns `true` if the condition was cleared, `false` on timeout.
    pub fn wait_while_until<T, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Deadline,
        mut condition: F,
    ) -> bool
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut **guard) {
            if deadline.has_elapsed() {
                return false;
            }
            self.inner.wait_until(guard, deadline.instant());
        }
        true
    }

    /// Wake one waiter, if any. Returns whether a thread was woken.
    pub fn signal(&self) -> bool {
        self.inner.notify_one()
    }

    /// Wake every waiter. Returns how many threads were woken.
    pub fn broadcast(&self) -> usize {
        self.inner.notify_all()
    }
}
