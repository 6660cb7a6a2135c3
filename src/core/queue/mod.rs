use std::cmp::Ordering;
use std::collections::VecDeque;

/// Backing sequence of a blocking queue: ordering logic only, no locking.
/// The head (index 0) is the next item handed out.
#[derive(Debug)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    /// Create a new, empty queue
    pub(crate) fn new() -> Self {
        Self { items: VecDeque::new() }
    }

    /// Append at the tail
    pub(crate) fn push_back(&mut self, item: T) {
        self.items.push_back(item);
        // --post operation assertion
        assert!(!self.items.is_empty(), "Queue must have at least one item after push");
    }

    /// Prepend at the head, making `item` the next one popped
    pub(crate) fn push_front(&mut self, item: T) {
        self.items.push_front(item);
        assert!(!self.items.is_empty(), "Queue must have at least one item after push_front");
    }

    /// Insert after every item that does not compare greater than `item`.
    ///
    /// Only meaningful when the sequence is already sorted by `cmp`; equal
    /// items keep their insertion order.
    pub(crate) fn insert_sorted<F>(&mut self, item: T, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        debug_assert!(
            self.is_sorted_by(&mut cmp),
            "push_sorted requires the queue to already be sorted"
        );
        let len_before = self.items.len();
        let position = self
            .items
            .partition_point(|existing| cmp(existing, &item) != Ordering::Greater);
        self.items.insert(position, item);
        assert_eq!(self.items.len(), len_before + 1, "Queue length should grow by 1");
    }

    /// Stable sort of the whole sequence
    pub(crate) fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.items.make_contiguous().sort_by(cmp);
    }

    /// Take the head item
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let len_before = self.items.len();
        let result = self.items.pop_front();
        // -- post op assertion: queue size decreases if pop succeeded
        match result {
            Some(_) => assert_eq!(self.items.len(), len_before - 1, "Queue length should decrease by 1"),
            None => assert_eq!(self.items.len(), len_before, "Queue length unchanged when empty"),
        }
        result
    }

    /// Remove and return the first item matching `predicate`
    pub(crate) fn take_first<F>(&mut self, predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let position = self.items.iter().position(predicate)?;
        self.items.remove(position)
    }

    /// Hand every remaining item out, head first
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..)
    }

    pub(crate) fn is_sorted_by<F>(&self, mut cmp: F) -> bool
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.items
            .iter()
            .zip(self.items.iter().skip(1))
            .all(|(a, b)| cmp(a, b) != Ordering::Greater)
    }

    /// Get the current queue length
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}
