//! Local edit buffering and batched synchronization for a remote
//! spreadsheet.
//!
//! Edits are recorded into a [`PendingChangeSet`] against a cached
//! [`SnapshotCache`] of the remote grid, and sent on an explicit
//! [`SyncEngine::flush`]. Each remote call succeeds or fails on its own;
//! failed cells stay queued and go out again on the next flush.
//!
//! # Example
//! ```rust
//! use sheet_sync::{Coord, EditableRange, MemoryTable, SyncEngine};
//!
//! let remote = MemoryTable::with_rows(vec![vec!["Week".into(), "Mon".into()]]);
//! let engine = SyncEngine::open(remote, EditableRange::default()).unwrap();
//!
//! engine.update_cell(Coord::new(0, 1), "8").unwrap();
//! engine.append_row([(1, "7.5"), (2, "8")]).unwrap();
//!
//! let result = engine.flush();
//! assert_eq!(result.succeeded, 3);
//! assert_eq!(engine.remote().cell(Coord::new(1, 2)), "8");
//! ```

mod coord;
mod engine;
mod error;
mod journal;
mod pending;
mod remote;
mod snapshot;
mod values;

pub use coord::{column_index, column_letters, Coord, EditableRange};
pub use engine::{EditHandle, FailureCause, FlushFailure, FlushResult, SyncEngine};
pub use error::{Error, Result};
pub use journal::{Journal, MemoryJournal};
#[cfg(feature = "sqlite")]
pub use journal::SqliteJournal;
pub use pending::{Origin, PendingChange, PendingChangeSet, Status};
pub use remote::{MemoryTable, RemoteCall, RemoteError, RemoteTable};
#[cfg(feature = "sheets")]
pub use remote::{SheetsTable, StaticToken, TokenProvider};
pub use snapshot::SnapshotCache;
pub use values::{current_time_formula, split_row_input, time_of_day_formula};
