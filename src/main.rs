use AsyncQueueMini::core::error::Result;
use AsyncQueueMini::{AsyncQueue, QueueConfig};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let config = QueueConfig::default().with_label("work").with_journal(None);
    let queue: AsyncQueue<String> = AsyncQueue::with_config(&config)?;

    let mut handles = vec![];

    // Spawn 4 producers, each pushing 3 items
    for producer in 0..4 {
        let queue = queue.retain();
        handles.push(thread::spawn(move || {
            for i in 1..=3 {
                queue.push(format!("P{}-Item {}", producer, i));
                thread::sleep(Duration::from_millis(10));
            }
        }));
    }

    // Spawn 2 consumers that stop once the queue stays empty for a while
    for _ in 0..2 {
        let queue = queue.retain();
        handles.push(thread::spawn(move || {
            while let Some(item) = queue.timeout_pop(Duration::from_millis(200)) {
                println!("consumed {}", item);
            }
        }));
    }

    // Wait for all threads to complete
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    println!("final length {}, {} journal entries", queue.length(), queue.journal().len());
    // Append the journal as NDJSON
    queue.append_journal("output.ndjson")?;
    Ok(())
}
