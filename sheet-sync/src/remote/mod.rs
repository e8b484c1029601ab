mod memory;
#[cfg(feature = "sheets")]
mod sheets;

pub use memory::{MemoryTable, RemoteCall};
#[cfg(feature = "sheets")]
pub use sheets::{SheetsTable, StaticToken, TokenProvider};

use thiserror::Error;

use crate::coord::Coord;

/// Why a call to the remote table failed. Every variant is treated as a
/// connectivity-class failure: the edit stays queued and is resent on the
/// next flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not authorized: {0}")]
    Auth(String),
    #[error("rate limited by remote service")]
    RateLimited,
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// The remote grid. Calls may be slow and may fail; no ordering is
/// assumed between separate calls.
pub trait RemoteTable: Send + Sync {
    fn read_all(&self) -> Result<Vec<Vec<String>>, RemoteError>;
    fn write_cell(&self, coord: Coord, value: &str) -> Result<(), RemoteError>;
    /// Appends one row after the last populated row. `values[i]` lands in
    /// column `i`.
    fn append_row(&self, values: &[String]) -> Result<(), RemoteError>;
}

impl<T: RemoteTable + ?Sized> RemoteTable for Box<T> {
    fn read_all(&self) -> Result<Vec<Vec<String>>, RemoteError> {
        (**self).read_all()
    }

    fn write_cell(&self, coord: Coord, value: &str) -> Result<(), RemoteError> {
        (**self).write_cell(coord, value)
    }

    fn append_row(&self, values: &[String]) -> Result<(), RemoteError> {
        (**self).append_row(values)
    }
}
