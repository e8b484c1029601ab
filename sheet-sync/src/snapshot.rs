use crate::coord::Coord;
use crate::pending::PendingChangeSet;

/// Last-known remote grid contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotCache {
    rows: Vec<Vec<String>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn load(&mut self, rows: Vec<Vec<String>>) {
        self.rows = rows;
    }

    /// Cells past the end read as empty: they have not been written yet.
    pub fn get(&self, coord: Coord) -> &str {
        self.rows
            .get(coord.row)
            .and_then(|row| row.get(coord.col))
            .map_or("", String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row, in columns.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Writes a value, padding missing rows and cells with empty strings.
    pub fn set(&mut self, coord: Coord, value: impl Into<String>) {
        if self.rows.len() <= coord.row {
            self.rows.resize_with(coord.row + 1, Vec::new);
        }
        let row = &mut self.rows[coord.row];
        if row.len() <= coord.col {
            row.resize(coord.col + 1, String::new());
        }
        row[coord.col] = value.into();
    }

    /// The grid as the user should see it: snapshot with every pending or
    /// failed value laid over it. Rows are padded to a common width.
    pub fn overlay(&self, pending: &PendingChangeSet) -> Vec<Vec<String>> {
        let mut view = self.clone();
        for change in pending.entries() {
            view.set(change.coord, change.value.clone());
        }

        let width = view.width();
        let mut rows = view.rows;
        for row in &mut rows {
            row.resize(width, String::new());
        }
        rows
    }
}
