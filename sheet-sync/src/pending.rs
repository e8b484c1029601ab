use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::coord::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Update,
    Append,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Update => "update",
            Origin::Append => "append",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "update" => Some(Origin::Update),
            "append" => Some(Origin::Append),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    InFlight,
    Failed,
}

/// An uncommitted edit. `revision` is stamped by [`PendingChangeSet::record`]
/// and lets a flush tell whether the entry was re-recorded while its call
/// was outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub coord: Coord,
    pub value: String,
    pub origin: Origin,
    pub status: Status,
    pub revision: u64,
}

/// Uncommitted edits keyed by coordinate, at most one per cell.
#[derive(Debug, Clone, Default)]
pub struct PendingChangeSet {
    entries: BTreeMap<Coord, PendingChange>,
    next_revision: u64,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins. An overwrite of an `Append` entry stays an append,
    /// since the row it belongs to does not exist remotely yet.
    pub fn record(&mut self, coord: Coord, value: impl Into<String>, origin: Origin) -> u64 {
        self.next_revision += 1;
        let revision = self.next_revision;
        let value = value.into();

        match self.entries.get_mut(&coord) {
            Some(entry) => {
                entry.value = value;
                entry.status = Status::Pending;
                entry.revision = revision;
                if entry.origin == Origin::Update {
                    entry.origin = origin;
                }
            }
            None => {
                self.entries.insert(
                    coord,
                    PendingChange { coord, value, origin, status: Status::Pending, revision },
                );
            }
        }
        revision
    }

    pub fn get(&self, coord: Coord) -> Option<&PendingChange> {
        self.entries.get(&coord)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PendingChange> {
        self.entries.values()
    }

    /// Entries eligible for the next flush, in (row, col) order. Failed
    /// entries are resubmitted alongside fresh ones.
    pub fn entries_for_flush(&self) -> impl Iterator<Item = &PendingChange> + Clone + '_ {
        self.entries.values().filter(|e| e.status != Status::InFlight)
    }

    pub fn mark_inflight<I>(&mut self, coords: I)
    where
        I: IntoIterator<Item = Coord>,
    {
        for coord in coords {
            if let Some(entry) = self.entries.get_mut(&coord) {
                entry.status = Status::InFlight;
            }
        }
    }

    pub fn mark_failed(&mut self, coord: Coord) {
        if let Some(entry) = self.entries.get_mut(&coord) {
            entry.status = Status::Failed;
        }
    }

    pub fn clear(&mut self, coord: Coord) -> Option<PendingChange> {
        self.entries.remove(&coord)
    }

    /// Clears `coord` only if it still holds `revision`. Returns whether
    /// the entry was removed.
    pub fn settle_success(&mut self, coord: Coord, revision: u64) -> bool {
        match self.entries.get(&coord) {
            Some(entry) if entry.revision == revision => {
                self.entries.remove(&coord);
                true
            }
            _ => false,
        }
    }

    /// Marks `coord` failed only if it still holds `revision`.
    pub fn settle_failure(&mut self, coord: Coord, revision: u64) -> bool {
        match self.entries.get_mut(&coord) {
            Some(entry) if entry.revision == revision => {
                entry.status = Status::Failed;
                true
            }
            _ => false,
        }
    }

    /// True when nothing is waiting to be sent or resent.
    pub fn is_empty(&self) -> bool {
        !self.entries.values().any(|e| e.status != Status::InFlight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|e| e.status == Status::Failed).count()
    }

    /// Row the next appended row should target: one past the snapshot, or
    /// one past the last queued append if that is further down.
    pub fn next_append_row(&self, row_count: usize) -> usize {
        self.entries
            .values()
            .filter(|e| e.origin == Origin::Append)
            .map(|e| e.coord.row + 1)
            .max()
            .map_or(row_count, |next| next.max(row_count))
    }

    /// Re-queues previously persisted changes as fresh entries. Rows that
    /// were queued for append move below `row_count` and any append already
    /// queued, in their original order, since the remote may have grown
    /// since they were saved.
    pub fn restore<I>(&mut self, changes: I, row_count: usize) -> usize
    where
        I: IntoIterator<Item = PendingChange>,
    {
        let changes: Vec<PendingChange> = changes.into_iter().collect();
        let append_rows: BTreeSet<usize> = changes
            .iter()
            .filter(|c| c.origin == Origin::Append)
            .map(|c| c.coord.row)
            .collect();

        let mut restored = 0;
        let mut new_rows: BTreeMap<usize, Vec<PendingChange>> = BTreeMap::new();
        for change in changes {
            if append_rows.contains(&change.coord.row) {
                new_rows.entry(change.coord.row).or_default().push(change);
            } else {
                self.record(change.coord, change.value, change.origin);
                restored += 1;
            }
        }

        for cells in new_rows.into_values() {
            let row = self.next_append_row(row_count);
            for change in cells {
                self.record(Coord::new(row, change.coord.col), change.value, change.origin);
                restored += 1;
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_get() {
        let mut set = PendingChangeSet::new();
        let c = Coord::new(3, 2);
        set.record(c, "42", Origin::Update);

        let entry = set.get(c).unwrap();
        assert_eq!(entry.value, "42");
        assert_eq!(entry.status, Status::Pending);
        assert_eq!(entry.origin, Origin::Update);
    }

    #[test]
    fn test_last_write_wins() {
        let mut set = PendingChangeSet::new();
        let c = Coord::new(0, 1);
        set.record(c, "v1", Origin::Update);
        set.record(c, "v2", Origin::Update);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(c).unwrap().value, "v2");
        assert_eq!(set.entries_for_flush().count(), 1);
    }

    #[test]
    fn test_append_origin_is_sticky() {
        let mut set = PendingChangeSet::new();
        let c = Coord::new(5, 1);
        set.record(c, "a", Origin::Append);
        set.record(c, "b", Origin::Update);

        let entry = set.get(c).unwrap();
        assert_eq!(entry.value, "b");
        assert_eq!(entry.origin, Origin::Append);
    }

    #[test]
    fn test_flush_order_is_row_major() {
        let mut set = PendingChangeSet::new();
        set.record(Coord::new(2, 1), "c", Origin::Update);
        set.record(Coord::new(0, 4), "b", Origin::Update);
        set.record(Coord::new(0, 2), "a", Origin::Update);

        let order: Vec<_> = set.entries_for_flush().map(|e| e.value.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);

        // restartable: a cloned iterator yields the same sequence again
        let iter = set.entries_for_flush();
        assert_eq!(iter.clone().count(), iter.count());
    }

    #[test]
    fn test_failed_entries_are_resubmitted() {
        let mut set = PendingChangeSet::new();
        let c = Coord::new(1, 1);
        set.record(c, "x", Origin::Update);
        set.mark_inflight([c]);
        assert_eq!(set.entries_for_flush().count(), 0);
        assert!(set.is_empty());

        set.mark_failed(c);
        assert!(!set.is_empty());
        assert_eq!(set.failed_count(), 1);
        let retry: Vec<_> = set.entries_for_flush().collect();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].status, Status::Failed);

        set.clear(c);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_stale_settlement_keeps_newer_value() {
        let mut set = PendingChangeSet::new();
        let c = Coord::new(1, 2);
        let old = set.record(c, "old", Origin::Update);
        set.mark_inflight([c]);
        set.record(c, "new", Origin::Update);

        assert!(!set.settle_success(c, old));
        let entry = set.get(c).unwrap();
        assert_eq!(entry.value, "new");
        assert_eq!(entry.status, Status::Pending);

        assert!(!set.settle_failure(c, old));
        assert_eq!(set.get(c).unwrap().status, Status::Pending);
    }

    #[test]
    fn test_next_append_row() {
        let mut set = PendingChangeSet::new();
        assert_eq!(set.next_append_row(5), 5);

        set.record(Coord::new(5, 1), "a", Origin::Append);
        assert_eq!(set.next_append_row(5), 6);

        // updates past the end do not reserve a row
        set.record(Coord::new(9, 1), "u", Origin::Update);
        assert_eq!(set.next_append_row(5), 6);

        // snapshot grew past the queued append
        assert_eq!(set.next_append_row(8), 8);
    }

    #[test]
    fn test_restore_requeues_as_pending() {
        let mut set = PendingChangeSet::new();
        let change = PendingChange {
            coord: Coord::new(4, 3),
            value: "kept".into(),
            origin: Origin::Append,
            status: Status::Failed,
            revision: 99,
        };
        assert_eq!(set.restore(vec![change], 4), 1);

        let entry = set.get(Coord::new(4, 3)).unwrap();
        assert_eq!(entry.status, Status::Pending);
        assert_eq!(entry.origin, Origin::Append);
        assert_eq!(entry.revision, 1);
    }

    #[test]
    fn test_restore_moves_new_rows_below_current_end() {
        let change = |row, col, value: &str, origin| PendingChange {
            coord: Coord::new(row, col),
            value: value.to_string(),
            origin,
            status: Status::Pending,
            revision: 0,
        };
        let saved = vec![
            change(0, 1, "edit", Origin::Update),
            change(2, 1, "first", Origin::Append),
            change(2, 3, "late", Origin::Update),
            change(3, 2, "second", Origin::Append),
        ];

        let mut set = PendingChangeSet::new();
        assert_eq!(set.restore(saved, 5), 4);

        assert_eq!(set.get(Coord::new(0, 1)).unwrap().value, "edit");
        assert_eq!(set.get(Coord::new(5, 1)).unwrap().value, "first");
        assert_eq!(set.get(Coord::new(5, 3)).unwrap().value, "late");
        assert_eq!(set.get(Coord::new(6, 2)).unwrap().value, "second");
        assert!(set.get(Coord::new(2, 1)).is_none());
        assert_eq!(set.next_append_row(5), 7);
    }
}
