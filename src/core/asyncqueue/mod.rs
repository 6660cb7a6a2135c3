//! Thread-safe, reference-counted blocking queue.
//!
//! Every handle is an [`AsyncQueue`]; cloning one (or calling
//! [`AsyncQueue::retain`]) adds a reference and dropping one (or calling
//! [`AsyncQueue::release`]) removes it. When the last handle goes away the
//! optional item destructor runs once on each item still queued.
//!
//! Single operations lock internally. To run several operations as one
//! critical section, take the lock with [`AsyncQueue::lock`] and call the
//! same operations on the returned [`AsyncQueueGuard`].

use crate::core::clock::Deadline;
use crate::core::config::QueueConfig;
use crate::core::error::Result;
use crate::core::event::{Outcome, QueueEvent, QueueOp};
use crate::core::log::{self, Journal};
use crate::core::queue::Queue;
use crate::core::sync::{ConditionVariable, Mutex, MutexGuard};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Called on each item left in the queue when it is destroyed
pub type ItemDestructor<T> = Box<dyn Fn(T) + Send + Sync>;

struct State<T> {
    items: Queue<T>,
    waiting_threads: usize,
    journal: Option<Journal>,
}

struct Shared<T> {
    label: String,
    created: Instant,
    state: Mutex<State<T>>,
    not_empty: ConditionVariable,
    item_destructor: Option<ItemDestructor<T>>,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // Last reference gone: nobody can be waiting, so no lock is needed
        let state = self.state.get_mut();
        if let Some(destroy) = self.item_destructor.as_ref() {
            for item in state.items.drain() {
                destroy(item);
            }
        }
    }
}

/// Handle to a shared blocking queue
pub struct AsyncQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> AsyncQueue<T> {
    /// Create an empty queue with one reference and no item destructor
    pub fn new() -> Self {
        Self::build(&QueueConfig::default(), None)
    }

    /// Create an empty queue whose leftover items are passed to `destroy`
    /// when the last reference is released
    pub fn new_full<F>(destroy: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::build(&QueueConfig::default(), Some(Box::new(destroy)))
    }

    /// Create an empty queue from `config`, rejecting it if invalid
    pub fn with_config(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    /// [`with_config`](Self::with_config) plus a destructor for leftover items
    pub fn with_config_full<F>(config: &QueueConfig, destroy: F) -> Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self::build(config, Some(Box::new(destroy))))
    }

    // `config` must already be validated
    fn build(config: &QueueConfig, item_destructor: Option<ItemDestructor<T>>) -> Self {
        let journal = match (config.journal, config.journal_capacity) {
            (false, _) => None,
            (true, None) => Some(Journal::new()),
            (true, Some(capacity)) => Some(Journal::with_capacity(capacity)),
        };

        Self {
            shared: Arc::new(Shared {
                label: config.label.clone(),
                created: Instant::now(),
                state: Mutex::new(State {
                    items: Queue::new(),
                    waiting_threads: 0,
                    journal,
                }),
                not_empty: ConditionVariable::new(),
                item_destructor,
            }),
        }
    }

    /// Add a reference; the returned handle refers to the same queue
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Drop this reference. Releasing the last one destroys the queue.
    pub fn release(self) {
        drop(self);
    }

    /// Number of live handles to this queue
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// Whether both handles refer to the same queue
    pub fn same_queue(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Label stamped on journal entries
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Acquire the queue's lock for a batch of operations.
    ///
    /// Do not call any locking method of this queue from the same thread
    /// while the guard is alive: the lock is not re-entrant.
    pub fn lock(&self) -> AsyncQueueGuard<'_, T> {
        AsyncQueueGuard {
            shared: &self.shared,
            state: self.shared.state.lock(),
        }
    }

    /// Append `item` at the tail and wake one waiting consumer
    pub fn push(&self, item: T) {
        self.lock().push(item);
    }

    /// Prepend `item` so it is the next one popped
    pub fn push_front(&self, item: T) {
        self.lock().push_front(item);
    }

    /// Insert `item` at the position `cmp` dictates; items ordering first
    /// are popped first. The queue must already be sorted by `cmp`, e.g.
    /// because every insertion went through `push_sorted` or after [`sort`](Self::sort).
    pub fn push_sorted<F>(&self, item: T, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.lock().push_sorted(item, cmp);
    }

    /// Stable sort of every queued item
    pub fn sort<F>(&self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.lock().sort(cmp);
    }

    /// Take the head item, blocking until one is available
    pub fn pop(&self) -> T {
        self.lock().pop()
    }

    /// Take the head item if there is one, without blocking
    pub fn try_pop(&self) -> Option<T> {
        self.lock().try_pop()
    }

    /// Take the head item, waiting no later than `deadline`
    pub fn timed_pop(&self, deadline: Deadline) -> Option<T> {
        self.lock().timed_pop(deadline)
    }

    /// Take the head item, waiting at most `timeout` in total
    pub fn timeout_pop(&self, timeout: Duration) -> Option<T> {
        self.timed_pop(Deadline::after(timeout))
    }

    /// Remove the first queued item equal to `item`. The item destructor is
    /// not called for it.
    pub fn remove(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.lock().remove(item)
    }

    /// Remove and return the first queued item matching `predicate`
    pub fn take_where<F>(&self, predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.lock().take_where(predicate)
    }

    /// Queued items minus consumers blocked waiting for one.
    ///
    /// Negative means that many consumers are waiting; zero is ambiguous.
    pub fn length(&self) -> isize {
        self.lock().length()
    }

    /// Snapshot of the journal; empty when journaling is disabled
    pub fn journal(&self) -> Vec<QueueEvent> {
        let state = self.shared.state.lock();
        state.journal.as_ref().map(Journal::entries).unwrap_or_default()
    }

    /// Append the current journal to an NDJSON file
    pub fn append_journal<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // Serialize outside the lock
        let entries = self.journal();
        log::append_journal(&entries, path)
    }
}

impl<T> Clone for AsyncQueue<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T> Default for AsyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AsyncQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("AsyncQueue");
        out.field("label", &self.shared.label);
        out.field("ref_count", &self.ref_count());
        // Never block in Debug: the caller may be holding the lock
        match self.shared.state.try_lock() {
            Some(state) => {
                out.field("items", &state.items.len());
                out.field("waiting_threads", &state.waiting_threads);
            }
            None => {
                out.field("items", &format_args!("<locked>"));
            }
        }
        out.finish()
    }
}

/// Exclusive access to a queue, obtained from [`AsyncQueue::lock`].
///
/// The lock is held until the guard is dropped or [`unlock`](Self::unlock)ed,
/// except while [`pop`](Self::pop) or [`timed_pop`](Self::timed_pop) are
/// waiting for an item: the wait releases it and reacquires it before
/// returning.
pub struct AsyncQueueGuard<'a, T> {
    shared: &'a Shared<T>,
    state: MutexGuard<'a, State<T>>,
}

impl<'a, T> AsyncQueueGuard<'a, T> {
    /// Append `item` at the tail and wake one waiting consumer
    pub fn push(&mut self, item: T) {
        self.state.items.push_back(item);
        self.announce(QueueOp::Push);
    }

    /// Prepend `item` so it is the next one popped
    pub fn push_front(&mut self, item: T) {
        self.state.items.push_front(item);
        self.announce(QueueOp::PushFront);
    }

    /// Insert `item` where `cmp` dictates; the queue must already be sorted by `cmp`
    pub fn push_sorted<F>(&mut self, item: T, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.state.items.insert_sorted(item, cmp);
        self.announce(QueueOp::PushSorted);
    }

    /// Stable sort of every queued item
    pub fn sort<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.state.items.sort_by(cmp);
        self.record(QueueOp::Sort, Outcome::Sorted);
    }

    /// Take the head item, releasing the lock while waiting for one
    pub fn pop(&mut self) -> T {
        let mut waiting = false;
        let item = loop {
            if let Some(item) = self.state.items.pop_front() {
                break item;
            }
            if !waiting {
                self.state.waiting_threads += 1;
                waiting = true;
            }
            self.shared.not_empty.wait(&mut self.state);
        };
        if waiting {
            self.state.waiting_threads -= 1;
        }

        self.record(QueueOp::Pop, Outcome::Delivered);
        item
    }

    /// Take the head item if there is one, without waiting
    pub fn try_pop(&mut self) -> Option<T> {
        let item = self.state.items.pop_front();
        let outcome = if item.is_some() { Outcome::Delivered } else { Outcome::Empty };
        self.record(QueueOp::TryPop, outcome);
        item
    }

    /// Take the head item, waiting no later than `deadline`
    pub fn timed_pop(&mut self, deadline: Deadline) -> Option<T> {
        let mut waiting = false;
        let item = loop {
            if let Some(item) = self.state.items.pop_front() {
                break Some(item);
            }
            if deadline.has_elapsed() {
                break None;
            }
            if !waiting {
                self.state.waiting_threads += 1;
                waiting = true;
            }
            self.shared.not_empty.wait_until(&mut self.state, deadline);
        };
        if waiting {
            self.state.waiting_threads -= 1;
        }

        let outcome = if item.is_some() { Outcome::Delivered } else { Outcome::TimedOut };
        self.record(QueueOp::TimedPop, outcome);
        item
    }

    /// Remove the first queued item equal to `item`, without the destructor
    pub fn remove(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.take_where(|queued| queued == item).is_some()
    }

    /// Remove and return the first queued item matching `predicate`
    pub fn take_where<F>(&mut self, predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let taken = self.state.items.take_first(predicate);
        let outcome = if taken.is_some() { Outcome::Removed } else { Outcome::NotFound };
        self.record(QueueOp::Remove, outcome);
        taken
    }

    /// Queued items minus consumers blocked waiting for one
    pub fn length(&self) -> isize {
        self.state.items.len() as isize - self.state.waiting_threads as isize
    }

    /// Release the lock
    pub fn unlock(self) {}

    // Wake one consumer for a freshly queued item
    fn announce(&mut self, op: QueueOp) {
        if self.state.waiting_threads > 0 {
            self.shared.not_empty.signal();
        }
        self.record(op, Outcome::Queued);
    }

    fn record(&mut self, op: QueueOp, outcome: Outcome) {
        let state = &mut *self.state;
        if let Some(journal) = state.journal.as_mut() {
            let at_micros = u64::try_from(self.shared.created.elapsed().as_micros()).unwrap_or(u64::MAX);
            journal.record(QueueEvent::new(
                &self.shared.label,
                op,
                outcome,
                state.items.len(),
                state.waiting_threads,
                at_micros,
            ));
        }
    }
}
