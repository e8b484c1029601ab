use std::collections::HashMap;

use super::Journal;
use crate::error::Result;
use crate::pending::PendingChange;

#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: HashMap<String, Vec<PendingChange>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Journal for MemoryJournal {
    fn load(&self, key: &str) -> Result<Vec<PendingChange>> {
        Ok(self.entries.get(key).cloned().unwrap_or_default())
    }

    fn save(&mut self, key: &str, changes: &[PendingChange]) -> Result<()> {
        if changes.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), changes.to_vec());
        }
        Ok(())
    }

    fn discard(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
