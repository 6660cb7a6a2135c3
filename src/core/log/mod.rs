use crate::core::error::Result;
use crate::core::event::QueueEvent;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// In-memory record of the operations performed on one queue.
///
/// Owned by the queue state and written under the queue's own lock.
#[derive(Clone, Debug)]
pub struct Journal {
    entries: VecDeque<QueueEvent>,
    capacity: Option<usize>,
}

impl Journal {
    /// Journal keeping every entry
    pub fn new() -> Self {
        Self { entries: VecDeque::new(), capacity: None }
    }

    /// Journal keeping at most the `capacity` most recent entries
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Journal capacity must be positive");
        Self { entries: VecDeque::with_capacity(capacity), capacity: Some(capacity) }
    }

    /// Record an event, evicting the oldest one when full
    pub fn record(&mut self, event: QueueEvent) {
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }
        let before = self.entries.len();
        self.entries.push_back(event);

        // --- Negative-space assertion: journal grew by exactly one entry
        assert_eq!(self.entries.len(), before + 1, "Journal must grow by exactly one entry");
    }

    pub fn entries(&self) -> Vec<QueueEvent> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded after the event with id `event_id`
    pub fn entries_since(&self, event_id: u64) -> Vec<QueueEvent> {
        self.entries
            .iter()
            .filter(|entry| entry.event_id > event_id)
            .cloned()
            .collect()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

/// Append entries to `path` as NDJSON, creating the file if needed
pub fn append_journal<P: AsRef<Path>>(entries: &[QueueEvent], path: P) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;

    for entry in entries {
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?; // one JSON object per line
    }
    Ok(())
}

/// Read back a journal written by [`append_journal`]
pub fn read_journal<P: AsRef<Path>>(path: P) -> Result<Vec<QueueEvent>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}
