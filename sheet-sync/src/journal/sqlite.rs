use rusqlite::{params, Connection};

use super::Journal;
use crate::coord::Coord;
use crate::error::{Error, Result};
use crate::pending::{Origin, PendingChange, Status};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pending_changes (
    sheet TEXT NOT NULL,
    row INTEGER NOT NULL,
    col INTEGER NOT NULL,
    value TEXT NOT NULL,
    origin TEXT NOT NULL,
    PRIMARY KEY (sheet, row, col)
) WITHOUT ROWID;

PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

pub struct SqliteJournal {
    conn: Connection,
}

impl SqliteJournal {
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch(INIT_SQL)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }
}

impl Journal for SqliteJournal {
    fn load(&self, key: &str) -> Result<Vec<PendingChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT row, col, value, origin FROM pending_changes WHERE sheet = ?1 ORDER BY row, col",
        )?;
        let mut rows = stmt.query(params![key])?;

        let mut changes = Vec::new();
        while let Some(row) = rows.next()? {
            let r: i64 = row.get(0)?;
            let c: i64 = row.get(1)?;
            let value: String = row.get(2)?;
            let origin: String = row.get(3)?;
            let origin = Origin::parse(&origin)
                .ok_or_else(|| Error::Journal(format!("unknown origin '{}'", origin)))?;

            changes.push(PendingChange {
                coord: Coord::new(r as usize, c as usize),
                value,
                origin,
                status: Status::Pending,
                revision: 0,
            });
        }
        Ok(changes)
    }

    fn save(&mut self, key: &str, changes: &[PendingChange]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM pending_changes WHERE sheet = ?1", params![key])?;
        for change in changes {
            tx.execute(
                "INSERT OR REPLACE INTO pending_changes (sheet, row, col, value, origin)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    key,
                    change.coord.row as i64,
                    change.coord.col as i64,
                    change.value,
                    change.origin.as_str(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn discard(&mut self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM pending_changes WHERE sheet = ?1", params![key])?;
        Ok(())
    }
}
