use thiserror::Error;

use crate::coord::{Coord, EditableRange};
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{coord} is outside the editable range {range}")]
    OutOfRange { coord: Coord, range: EditableRange },

    #[error("invalid cell reference: {0}")]
    InvalidCoord(String),

    #[error("invalid column range: {0}")]
    InvalidRange(String),

    #[error(transparent)]
    Connectivity(#[from] RemoteError),

    #[error("flush partially failed: {succeeded} written, {failed} failed")]
    PartialFlush { succeeded: usize, failed: usize },

    #[error("{count} edits are still queued; flush them first")]
    Unflushed { count: usize },

    #[error("journal error: {0}")]
    Journal(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Journal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
