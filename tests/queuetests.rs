use AsyncQueueMini::core::event::{Outcome, QueueOp};
use AsyncQueueMini::core::log::read_journal;
use AsyncQueueMini::{AsyncQueue, Deadline, QueueConfig};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Spin until `length()` reports `expected`, i.e. the right number of
/// consumers are parked inside `pop`
fn wait_for_length<T>(queue: &AsyncQueue<T>, expected: isize) {
    let give_up = Instant::now() + Duration::from_secs(5);
    while queue.length() != expected {
        assert!(Instant::now() < give_up, "length never reached {}", expected);
        thread::sleep(Duration::from_millis(1));
    }
}

fn drain<T>(queue: &AsyncQueue<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Some(item) = queue.try_pop() {
        items.push(item);
    }
    items
}

#[test]
fn test_fifo_order() {
    let queue = AsyncQueue::new();
    for n in 1..=5 {
        queue.push(n);
    }
    let popped: Vec<i32> = (0..5).map(|_| queue.pop()).collect();
    assert_eq!(popped, vec![1, 2, 3, 4, 5]);
    assert_eq!(queue.length(), 0);
}

#[test]
fn test_push_front_jumps_the_line() {
    let queue = AsyncQueue::new();
    queue.push("a");
    queue.push("b");
    queue.push_front("x");
    assert_eq!(drain(&queue), vec!["x", "a", "b"]);
}

#[test]
fn test_pop_blocks_until_push() {
    let queue = AsyncQueue::new();
    let consumer = {
        let queue = queue.retain();
        thread::spawn(move || queue.pop())
    };

    // Consumer is parked once length goes negative
    wait_for_length(&queue, -1);
    queue.push(42);

    assert_eq!(consumer.join().unwrap(), 42);
    assert_eq!(queue.length(), 0);
}

#[test]
fn test_try_pop_never_blocks() {
    let queue: AsyncQueue<u32> = AsyncQueue::new();
    let start = Instant::now();
    assert_eq!(queue.try_pop(), None);
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_timed_pop_times_out() {
    let queue: AsyncQueue<u32> = AsyncQueue::new();
    let start = Instant::now();
    let result = queue.timed_pop(Deadline::after(Duration::from_millis(50)));
    let elapsed = start.elapsed();

    assert_eq!(result, None);
    assert!(elapsed >= Duration::from_millis(50), "returned early after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "returned late after {:?}", elapsed);
    // The timed-out consumer no longer counts as a waiter
    assert_eq!(queue.length(), 0);
}

#[test]
fn test_timed_pop_receives_item_before_deadline() {
    let queue = AsyncQueue::new();
    let consumer = {
        let queue = queue.retain();
        thread::spawn(move || queue.timeout_pop(Duration::from_secs(10)))
    };

    wait_for_length(&queue, -1);
    queue.push("late");
    assert_eq!(consumer.join().unwrap(), Some("late"));
}

#[test]
fn test_release_drains_leftovers_through_destructor() {
    let destroyed = Arc::new(Mutex::new(Vec::new()));
    let queue = {
        let destroyed = Arc::clone(&destroyed);
        AsyncQueue::new_full(move |item: &'static str| destroyed.lock().unwrap().push(item))
    };

    for item in ["a", "b", "c", "d"] {
        queue.push(item);
    }
    // Popped items belong to the caller, the destructor never sees them
    assert_eq!(queue.pop(), "a");

    let extra = queue.retain();
    assert_eq!(queue.ref_count(), 2);
    queue.release();
    assert!(destroyed.lock().unwrap().is_empty(), "queue destroyed while still referenced");

    extra.release();
    let destroyed: HashSet<&str> = destroyed.lock().unwrap().iter().copied().collect();
    assert_eq!(destroyed, HashSet::from(["b", "c", "d"]));
}

#[test]
fn test_destructor_runs_exactly_once_per_item() {
    let calls = Arc::new(Mutex::new(0usize));
    {
        let calls = Arc::clone(&calls);
        let queue = AsyncQueue::new_full(move |_item: u8| *calls.lock().unwrap() += 1);
        queue.push(1);
        queue.push(2);
        queue.push(3);
        let _second = queue.clone();
    }
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[test]
fn test_remove_first_occurrence() {
    let destroyed = Arc::new(Mutex::new(0usize));
    let queue = {
        let destroyed = Arc::clone(&destroyed);
        AsyncQueue::new_full(move |_item: char| *destroyed.lock().unwrap() += 1)
    };
    queue.push('a');
    queue.push('b');
    queue.push('c');

    assert!(queue.remove(&'b'));
    assert!(!queue.remove(&'b'));
    assert_eq!(*destroyed.lock().unwrap(), 0, "remove must not call the destructor");
    assert_eq!(drain(&queue), vec!['a', 'c']);
}

#[test]
fn test_take_where_matches_handle_identity() {
    let queue = AsyncQueue::new();
    let first = Arc::new(String::from("same"));
    let second = Arc::new(String::from("same"));
    queue.push(Arc::clone(&first));
    queue.push(Arc::clone(&second));

    let taken = queue.take_where(|item| Arc::ptr_eq(item, &second)).unwrap();
    assert!(Arc::ptr_eq(&taken, &second));
    assert!(Arc::ptr_eq(&queue.pop(), &first));
}

#[test]
fn test_length_counts_blocked_consumers() {
    let queue: AsyncQueue<u32> = AsyncQueue::new();
    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let queue = queue.retain();
            thread::spawn(move || queue.pop())
        })
        .collect();

    wait_for_length(&queue, -2);

    queue.push(7);
    // 1 item - 2 waiters before the woken consumer runs, 0 - 1 after
    assert_eq!(queue.length(), -1);

    queue.push(8);
    let mut popped: Vec<u32> = consumers.into_iter().map(|c| c.join().unwrap()).collect();
    popped.sort();
    assert_eq!(popped, vec![7, 8]);
    assert_eq!(queue.length(), 0);
}

#[test]
fn test_sort_then_pop() {
    let queue = AsyncQueue::new();
    queue.push(3);
    queue.push(1);
    queue.push(2);
    queue.sort(|a: &i32, b: &i32| a.cmp(b));
    assert_eq!((queue.pop(), queue.pop(), queue.pop()), (1, 2, 3));
}

#[test]
fn test_push_sorted_keeps_priority_order() {
    let queue = AsyncQueue::new();
    let by_priority = |a: &(u8, &str), b: &(u8, &str)| a.0.cmp(&b.0);

    queue.push_sorted((5, "low"), by_priority);
    queue.push_sorted((1, "urgent"), by_priority);
    queue.push_sorted((3, "normal"), by_priority);
    queue.push_sorted((1, "urgent-2"), by_priority);

    let names: Vec<&str> = drain(&queue).into_iter().map(|(_, name)| name).collect();
    assert_eq!(names, vec!["urgent", "urgent-2", "normal", "low"]);
}

#[test]
fn test_push_sorted_wakes_consumer() {
    let queue = AsyncQueue::new();
    let consumer = {
        let queue = queue.retain();
        thread::spawn(move || queue.pop())
    };
    wait_for_length(&queue, -1);
    queue.push_sorted(9, |a: &i32, b: &i32| a.cmp(b));
    assert_eq!(consumer.join().unwrap(), 9);
}

#[test]
fn test_guard_batches_operations() {
    let queue = AsyncQueue::new();
    {
        let mut guard = queue.lock();
        guard.push(2);
        guard.push(3);
        guard.push_front(1);
        assert_eq!(guard.length(), 3);
        assert!(guard.remove(&3));
        assert_eq!(guard.try_pop(), Some(1));
        guard.unlock();
    }
    assert_eq!(queue.length(), 1);
    assert_eq!(queue.pop(), 2);
}

#[test]
fn test_guard_pop_releases_lock_while_waiting() {
    let queue = AsyncQueue::new();
    let consumer = {
        let queue = queue.retain();
        thread::spawn(move || {
            let mut guard = queue.lock();
            let first = guard.pop();
            // Still holding the lock: nothing can slip in between
            let second = guard.try_pop();
            (first, second)
        })
    };

    wait_for_length(&queue, -1);
    {
        let mut guard = queue.lock();
        guard.push("one");
        guard.push("two");
    }
    assert_eq!(consumer.join().unwrap(), ("one", Some("two")));
}

#[test]
fn test_many_producers_many_consumers() {
    let queue = AsyncQueue::new();
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = queue.retain();
            thread::spawn(move || {
                for i in 0..250 {
                    queue.push(p * 1000 + i);
                }
            })
        })
        .collect();
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.retain();
            thread::spawn(move || (0..250).map(|_| queue.pop()).collect::<Vec<u32>>())
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    let mut seen: Vec<u32> = consumers.into_iter().flat_map(|c| c.join().unwrap()).collect();
    seen.sort();
    let expected: Vec<u32> = (0..4).flat_map(|p| (0..250).map(move |i| p * 1000 + i)).collect();
    assert_eq!(seen, expected);
    assert_eq!(queue.length(), 0);
    assert_eq!(queue.ref_count(), 1);
}

#[test]
fn test_per_producer_order_is_preserved() {
    let queue = AsyncQueue::new();
    let producers: Vec<_> = (0..3u32)
        .map(|p| {
            let queue = queue.retain();
            thread::spawn(move || {
                for i in 0..100u32 {
                    queue.push((p, i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut last = [None::<u32>; 3];
    for (p, i) in drain(&queue) {
        if let Some(prev) = last[p as usize] {
            assert!(i > prev, "producer {} out of order", p);
        }
        last[p as usize] = Some(i);
    }
}

#[test]
fn test_retain_shares_one_queue() {
    let queue = AsyncQueue::new();
    let other = queue.retain();
    assert!(queue.same_queue(&other));
    assert!(!queue.same_queue(&AsyncQueue::new()));

    other.push(1);
    assert_eq!(queue.try_pop(), Some(1));
    other.release();
    assert_eq!(queue.ref_count(), 1);
}

#[test]
fn test_journal_records_operations() {
    let config = QueueConfig::default().with_label("jobs").with_journal(None);
    let queue = AsyncQueue::with_config(&config).unwrap();

    queue.push(1);
    queue.push_front(0);
    assert_eq!(queue.try_pop(), Some(0));
    assert!(!queue.remove(&9));
    assert_eq!(queue.timed_pop(Deadline::now()), Some(1));
    assert_eq!(queue.try_pop(), None);

    let journal = queue.journal();
    let trace: Vec<(QueueOp, Outcome)> = journal.iter().map(|e| (e.op, e.outcome)).collect();
    assert_eq!(
        trace,
        vec![
            (QueueOp::Push, Outcome::Queued),
            (QueueOp::PushFront, Outcome::Queued),
            (QueueOp::TryPop, Outcome::Delivered),
            (QueueOp::Remove, Outcome::NotFound),
            (QueueOp::TimedPop, Outcome::Delivered),
            (QueueOp::TryPop, Outcome::Empty),
        ]
    );
    assert!(journal.iter().all(|e| e.queue == "jobs"));
    let delivered = journal.iter().filter(|e| e.delivered()).count();
    assert_eq!(delivered, 2);
    assert_eq!(journal[1].items, 2);
    assert!(journal.windows(2).all(|w| w[0].event_id < w[1].event_id));
}

#[test]
fn test_journal_exports_ndjson() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.ndjson");

    let config = QueueConfig::default().with_journal(Some(8));
    let queue = AsyncQueue::with_config(&config).unwrap();
    queue.push("a");
    queue.sort(|a: &&str, b: &&str| a.cmp(b));
    queue.append_journal(&path).unwrap();

    let read = read_journal(&path).unwrap();
    assert_eq!(read, queue.journal());
    assert_eq!(read[1].op, QueueOp::Sort);
    assert_eq!(read[0].length(), 1);
}
