use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options a queue is created with. Every field has a default, so a JSON
/// document only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Name stamped on journal entries
    pub label: String,
    /// Record every operation in an in-memory journal
    pub journal: bool,
    /// Keep only the most recent entries; `None` keeps all of them
    pub journal_capacity: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            label: "queue".to_string(),
            journal: false,
            journal_capacity: None,
        }
    }
}

impl QueueConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_journal(mut self, capacity: Option<usize>) -> Self {
        self.journal = true;
        self.journal_capacity = capacity;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.journal_capacity == Some(0) {
            return Err(Error::InvalidConfig("journal_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}
