use std::collections::HashMap;

use parking_lot::Mutex;

use super::{RemoteError, RemoteTable};
use crate::coord::Coord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ReadAll,
    WriteCell(Coord, String),
    AppendRow(Vec<String>),
}

/// In-process remote table. Failures can be scripted per cell or per
/// append so partial-failure paths can be driven deterministically.
pub struct MemoryTable {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    rows: Vec<Vec<String>>,
    cell_failures: HashMap<Coord, RemoteError>,
    append_failures: Vec<RemoteError>,
    read_failure: Option<RemoteError>,
    calls: Vec<RemoteCall>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self { inner: Mutex::new(MemoryInner::default()) }
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        let table = Self::new();
        table.inner.lock().rows = rows;
        table
    }

    /// Writes to `coord` fail with `err` until [`heal`](Self::heal).
    pub fn fail_at(&self, coord: Coord, err: RemoteError) {
        self.inner.lock().cell_failures.insert(coord, err);
    }

    /// The next `count` appends fail with `err`.
    pub fn fail_appends(&self, count: usize, err: RemoteError) {
        let mut inner = self.inner.lock();
        inner.append_failures.extend(std::iter::repeat(err).take(count));
    }

    pub fn fail_reads(&self, err: RemoteError) {
        self.inner.lock().read_failure = Some(err);
    }

    pub fn heal(&self) {
        let mut inner = self.inner.lock();
        inner.cell_failures.clear();
        inner.append_failures.clear();
        inner.read_failure = None;
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.inner.lock().rows.clone()
    }

    pub fn cell(&self, coord: Coord) -> String {
        let inner = self.inner.lock();
        inner
            .rows
            .get(coord.row)
            .and_then(|row| row.get(coord.col))
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteTable for MemoryTable {
    fn read_all(&self) -> Result<Vec<Vec<String>>, RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::ReadAll);
        if let Some(err) = inner.read_failure.clone() {
            return Err(err);
        }
        Ok(inner.rows.clone())
    }

    fn write_cell(&self, coord: Coord, value: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::WriteCell(coord, value.to_string()));
        if let Some(err) = inner.cell_failures.get(&coord) {
            return Err(err.clone());
        }

        if inner.rows.len() <= coord.row {
            inner.rows.resize_with(coord.row + 1, Vec::new);
        }
        let row = &mut inner.rows[coord.row];
        if row.len() <= coord.col {
            row.resize(coord.col + 1, String::new());
        }
        row[coord.col] = value.to_string();
        Ok(())
    }

    fn append_row(&self, values: &[String]) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::AppendRow(values.to_vec()));
        if !inner.append_failures.is_empty() {
            return Err(inner.append_failures.remove(0));
        }
        inner.rows.push(values.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_append() {
        let table = MemoryTable::with_rows(vec![vec!["h".into()]]);
        table.write_cell(Coord::new(2, 1), "x").unwrap();
        table.append_row(&["a".to_string(), "b".to_string()]).unwrap();

        let rows = table.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], vec!["", "x"]);
        assert_eq!(rows[3], vec!["a", "b"]);
        assert_eq!(table.calls().len(), 2);
    }

    #[test]
    fn test_scripted_failures() {
        let table = MemoryTable::new();
        let c = Coord::new(0, 0);
        table.fail_at(c, RemoteError::RateLimited);
        table.fail_appends(1, RemoteError::Network("reset".into()));

        assert_eq!(table.write_cell(c, "v"), Err(RemoteError::RateLimited));
        assert!(table.append_row(&["a".to_string()]).is_err());
        assert!(table.append_row(&["b".to_string()]).is_ok());

        table.heal();
        assert!(table.write_cell(c, "v").is_ok());
        assert_eq!(table.cell(c), "v");
    }
}
