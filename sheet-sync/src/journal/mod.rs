mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryJournal;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteJournal;

use crate::error::Result;
use crate::pending::PendingChange;

/// Durable home for edits that could not be flushed before the session
/// ended. Keyed by sheet, so one journal can serve several spreadsheets.
pub trait Journal {
    fn load(&self, key: &str) -> Result<Vec<PendingChange>>;
    /// Replaces whatever was stored under `key`.
    fn save(&mut self, key: &str, changes: &[PendingChange]) -> Result<()>;
    fn discard(&mut self, key: &str) -> Result<()>;
}
