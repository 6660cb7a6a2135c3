use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static EVENT_COUNTER: AtomicU64 = AtomicU64::new(1); // global counter for unique event IDs

/// Queue operation that produced an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueOp {
    Push,
    PushFront,
    PushSorted,
    Sort,
    Pop,
    TryPop,
    TimedPop,
    Remove,
}

/// What the operation achieved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Queued,
    Delivered,
    Empty,
    TimedOut,
    Removed,
    NotFound,
    Sorted,
}

/// One journaled queue operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub event_id: u64, // unique across every queue in the process
    pub queue: String,
    pub op: QueueOp,
    pub outcome: Outcome,
    pub items: usize,   // items queued after the operation
    pub waiters: usize, // consumers still blocked after the operation
    pub at_micros: u64, // since the queue was created
}

impl QueueEvent {
    fn next_id() -> u64 {
        EVENT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    pub fn new(queue: &str, op: QueueOp, outcome: Outcome, items: usize, waiters: usize, at_micros: u64) -> Self {
        Self {
            event_id: Self::next_id(),
            queue: queue.to_string(),
            op,
            outcome,
            items,
            waiters,
            at_micros,
        }
    }

    /// Queue length as reported by `AsyncQueue::length` right after this event
    pub fn length(&self) -> isize {
        self.items as isize - self.waiters as isize
    }

    /// Whether the operation handed an item to the caller
    pub fn delivered(&self) -> bool {
        self.outcome == Outcome::Delivered
    }
}
