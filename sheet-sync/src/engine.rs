use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::coord::{Coord, EditableRange};
use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::pending::{Origin, PendingChange, PendingChangeSet};
use crate::remote::{RemoteError, RemoteTable};
use crate::snapshot::SnapshotCache;

/// State of one open-table session, shared between the engine and any
/// [`EditHandle`]s. Lock order is always `pending` before `snapshot`.
struct Session {
    range: EditableRange,
    pending: Mutex<PendingChangeSet>,
    snapshot: RwLock<SnapshotCache>,
}

impl Session {
    fn check(&self, coord: Coord) -> Result<()> {
        if self.range.contains(coord.col) {
            Ok(())
        } else {
            Err(Error::OutOfRange { coord, range: self.range })
        }
    }

    fn update_cell(&self, coord: Coord, value: String) -> Result<()> {
        self.check(coord)?;
        let revision = self.pending.lock().record(coord, value, Origin::Update);
        debug!(cell = %coord, revision, "recorded update");
        Ok(())
    }

    fn append_row(&self, values: BTreeMap<usize, String>) -> Result<usize> {
        let mut pending = self.pending.lock();
        let row = pending.next_append_row(self.snapshot.read().row_count());

        let cells: Vec<(Coord, String)> = values
            .into_iter()
            .map(|(col, value)| (Coord::new(row, col), value))
            .collect();
        for (coord, _) in &cells {
            self.check(*coord)?;
        }

        let count = cells.len();
        for (coord, value) in cells {
            pending.record(coord, value, Origin::Append);
        }
        debug!(row, cells = count, "recorded append");
        Ok(row)
    }
}

/// Cheap, cloneable entry point for recording edits from another thread
/// while [`SyncEngine::flush`] is running.
#[derive(Clone)]
pub struct EditHandle {
    session: Arc<Session>,
}

impl EditHandle {
    pub fn update_cell(&self, coord: Coord, value: impl Into<String>) -> Result<()> {
        self.session.update_cell(coord, value.into())
    }

    pub fn append_row<I, V>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (usize, V)>,
        V: Into<String>,
    {
        self.session
            .append_row(values.into_iter().map(|(c, v)| (c, v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Remote(RemoteError),
    /// Not sent because an earlier append in the same flush failed and
    /// this write targets that row or one below it.
    Deferred { after_row: usize },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Remote(e) => write!(f, "{}", e),
            FailureCause::Deferred { after_row } => {
                write!(f, "deferred: append of row {} failed", after_row + 1)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushFailure {
    pub coord: Coord,
    pub cause: FailureCause,
}

impl FlushFailure {
    pub fn message(&self) -> String {
        self.cause.to_string()
    }
}

/// Outcome of one flush. Counts are per cell, not per remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushResult {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FlushFailure>,
    pub calls: usize,
}

impl FlushResult {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn is_noop(&self) -> bool {
        self.succeeded == 0 && self.failed == 0
    }

    pub fn into_result(self) -> Result<FlushResult> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(Error::PartialFlush { succeeded: self.succeeded, failed: self.failed })
        }
    }
}

/// One remote call's worth of work.
#[derive(Debug)]
enum Unit {
    Update(PendingChange),
    Append { row: usize, cells: Vec<PendingChange> },
}

impl Unit {
    fn first(&self) -> Coord {
        match self {
            Unit::Update(change) => change.coord,
            Unit::Append { cells, .. } => cells[0].coord,
        }
    }

    fn cells(&self) -> &[PendingChange] {
        match self {
            Unit::Update(change) => std::slice::from_ref(change),
            Unit::Append { cells, .. } => cells,
        }
    }
}

/// Splits a sorted batch into remote calls: one `append_row` per target
/// row, one `write_cell` per remaining update. Updates that land on a row
/// being appended in this batch ride along with the append.
fn plan(batch: Vec<PendingChange>) -> Vec<Unit> {
    let append_rows: BTreeSet<usize> = batch
        .iter()
        .filter(|c| c.origin == Origin::Append)
        .map(|c| c.coord.row)
        .collect();

    let mut groups: BTreeMap<usize, Vec<PendingChange>> = BTreeMap::new();
    let mut units = Vec::new();
    for change in batch {
        if append_rows.contains(&change.coord.row) {
            groups.entry(change.coord.row).or_default().push(change);
        } else {
            units.push(Unit::Update(change));
        }
    }
    units.extend(groups.into_iter().map(|(row, cells)| Unit::Append { row, cells }));
    units.sort_by_key(Unit::first);
    units
}

/// Columns `0..=max` of a new row, with unset cells left empty.
fn row_values(cells: &[PendingChange]) -> Vec<String> {
    let width = cells.iter().map(|c| c.coord.col + 1).max().unwrap_or(0);
    let mut values = vec![String::new(); width];
    for cell in cells {
        values[cell.coord.col] = cell.value.clone();
    }
    values
}

pub struct SyncEngine<R: RemoteTable> {
    remote: R,
    session: Arc<Session>,
}

impl<R: RemoteTable> SyncEngine<R> {
    /// Reads the whole remote table and starts a session on it.
    pub fn open(remote: R, range: EditableRange) -> Result<Self> {
        let rows = remote.read_all()?;
        info!(rows = rows.len(), %range, "loaded remote table");
        Ok(Self::with_snapshot(remote, range, rows))
    }

    pub fn with_snapshot(remote: R, range: EditableRange, rows: Vec<Vec<String>>) -> Self {
        let session = Session {
            range,
            pending: Mutex::new(PendingChangeSet::new()),
            snapshot: RwLock::new(SnapshotCache::from_rows(rows)),
        };
        Self { remote, session: Arc::new(session) }
    }

    pub fn handle(&self) -> EditHandle {
        EditHandle { session: Arc::clone(&self.session) }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn range(&self) -> EditableRange {
        self.session.range
    }

    pub fn update_cell(&self, coord: Coord, value: impl Into<String>) -> Result<()> {
        self.session.update_cell(coord, value.into())
    }

    /// Queues a new row below everything known or already queued. Keys are
    /// column indexes within the row and must fall in the editable range;
    /// one bad column rejects the whole row. Returns the target row.
    pub fn append_row<I, V>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (usize, V)>,
        V: Into<String>,
    {
        self.session
            .append_row(values.into_iter().map(|(c, v)| (c, v.into())).collect())
    }

    pub fn get_pending(&self, coord: Coord) -> Option<PendingChange> {
        self.session.pending.lock().get(coord).cloned()
    }

    pub fn pending(&self) -> Vec<PendingChange> {
        self.session.pending.lock().entries().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.session.pending.lock().len()
    }

    pub fn has_unflushed(&self) -> bool {
        !self.session.pending.lock().is_empty()
    }

    pub fn cached(&self, coord: Coord) -> String {
        self.session.snapshot.read().get(coord).to_string()
    }

    pub fn row_count(&self) -> usize {
        self.session.snapshot.read().row_count()
    }

    pub fn snapshot(&self) -> SnapshotCache {
        self.session.snapshot.read().clone()
    }

    /// Snapshot with pending edits laid over it.
    pub fn display(&self) -> Vec<Vec<String>> {
        let pending = self.session.pending.lock();
        let snapshot = self.session.snapshot.read();
        snapshot.overlay(&pending)
    }

    /// Re-reads the remote table. Pending edits are kept and still overlay
    /// the fresh snapshot.
    pub fn refresh(&self) -> Result<()> {
        let rows = self.remote.read_all()?;
        info!(rows = rows.len(), "refreshed snapshot");
        self.session.snapshot.write().load(rows);
        Ok(())
    }

    /// Starts a fresh session after `select` repoints the remote, e.g. at
    /// another worksheet. Refused while edits are queued. Handles taken
    /// before the switch keep writing to the old, discarded session.
    pub fn switch_session<F>(&mut self, select: F) -> Result<()>
    where
        F: FnOnce(&mut R) -> std::result::Result<(), RemoteError>,
    {
        let queued = self.pending_count();
        if queued > 0 {
            return Err(Error::Unflushed { count: queued });
        }

        select(&mut self.remote)?;
        let rows = self.remote.read_all()?;
        info!(rows = rows.len(), "switched session");
        self.session = Arc::new(Session {
            range: self.session.range,
            pending: Mutex::new(PendingChangeSet::new()),
            snapshot: RwLock::new(SnapshotCache::from_rows(rows)),
        });
        Ok(())
    }

    /// Sends everything pending or previously failed. Edits recorded while
    /// this runs wait for the next flush. Remote failures never escape;
    /// they are reported in the result and the affected entries stay
    /// queued.
    pub fn flush(&self) -> FlushResult {
        let batch: Vec<PendingChange> = {
            let mut pending = self.session.pending.lock();
            let batch: Vec<_> = pending.entries_for_flush().cloned().collect();
            pending.mark_inflight(batch.iter().map(|c| c.coord));
            batch
        };

        let mut result = FlushResult::default();
        if batch.is_empty() {
            debug!("flush: nothing pending");
            return result;
        }

        let units = plan(batch);
        info!(units = units.len(), "flush started");

        let mut failed_append: Option<usize> = None;
        for unit in &units {
            // Past a failed append, any write would shift where the retried
            // row lands.
            let deferred = failed_append.filter(|&after| unit.first().row >= after);
            let outcome = match (unit, deferred) {
                (_, Some(after_row)) => {
                    debug!(cell = %unit.first(), after_row, "deferred behind failed append");
                    Err(FailureCause::Deferred { after_row })
                }
                (Unit::Update(change), None) => {
                    result.calls += 1;
                    self.remote
                        .write_cell(change.coord, &change.value)
                        .map_err(FailureCause::Remote)
                }
                (Unit::Append { row, cells }, None) => {
                    result.calls += 1;
                    let outcome = self
                        .remote
                        .append_row(&row_values(cells))
                        .map_err(FailureCause::Remote);
                    if outcome.is_err() {
                        failed_append = Some(*row);
                    }
                    outcome
                }
            };
            self.reconcile(unit, outcome, &mut result);
        }

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            calls = result.calls,
            "flush finished"
        );
        result
    }

    fn reconcile(&self, unit: &Unit, outcome: std::result::Result<(), FailureCause>, result: &mut FlushResult) {
        let mut pending = self.session.pending.lock();
        match outcome {
            Ok(()) => {
                let mut snapshot = self.session.snapshot.write();
                for cell in unit.cells() {
                    snapshot.set(cell.coord, cell.value.clone());
                    if !pending.settle_success(cell.coord, cell.revision) {
                        debug!(cell = %cell.coord, "re-edited during flush, keeping newer value");
                    }
                    result.succeeded += 1;
                }
            }
            Err(cause) => {
                if let FailureCause::Remote(err) = &cause {
                    warn!(cell = %unit.first(), error = %err, "remote write failed");
                }
                for cell in unit.cells() {
                    pending.settle_failure(cell.coord, cell.revision);
                    result.failures.push(FlushFailure { coord: cell.coord, cause: cause.clone() });
                    result.failed += 1;
                }
            }
        }
    }

    /// Writes every queued edit to `journal` under `key`, replacing what
    /// was there. Returns how many were saved.
    pub fn persist_pending<J: Journal + ?Sized>(&self, journal: &mut J, key: &str) -> Result<usize> {
        let changes = self.pending();
        journal.save(key, &changes)?;
        if !changes.is_empty() {
            info!(key, count = changes.len(), "journaled unflushed edits");
        }
        Ok(changes.len())
    }

    /// Re-queues edits journaled by an earlier session and removes them
    /// from the journal. Entries outside the editable range are dropped.
    /// Journaled new rows are re-targeted below the current snapshot.
    pub fn restore_pending<J: Journal + ?Sized>(&self, journal: &mut J, key: &str) -> Result<usize> {
        let (keep, dropped): (Vec<_>, Vec<_>) = journal
            .load(key)?
            .into_iter()
            .partition(|c| self.session.range.contains(c.coord.col));
        for change in &dropped {
            warn!(cell = %change.coord, "dropping journaled edit outside editable range");
        }

        let restored = {
            let mut pending = self.session.pending.lock();
            let row_count = self.session.snapshot.read().row_count();
            pending.restore(keep, row_count)
        };
        journal.discard(key)?;
        if restored > 0 {
            info!(key, restored, "restored journaled edits");
        }
        Ok(restored)
    }
}


#[cfg(test)]
mod concurrency_tests {
    use std::sync::mpsc;
    use std::thread;

    use super::*;
    use crate::pending::Status;
    use crate::remote::MemoryTable;

    /// Blocks every write until the test lets it through.
    struct GatedTable {
        inner: MemoryTable,
        entered: Mutex<mpsc::Sender<Coord>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl RemoteTable for GatedTable {
        fn read_all(&self) -> std::result::Result<Vec<Vec<String>>, RemoteError> {
            self.inner.read_all()
        }

        fn write_cell(&self, coord: Coord, value: &str) -> std::result::Result<(), RemoteError> {
            self.entered.lock().send(coord).unwrap();
            self.release.lock().recv().unwrap();
            self.inner.write_cell(coord, value)
        }

        fn append_row(&self, values: &[String]) -> std::result::Result<(), RemoteError> {
            self.inner.append_row(values)
        }
    }

    fn gated() -> (SyncEngine<GatedTable>, mpsc::Receiver<Coord>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let table = GatedTable {
            inner: MemoryTable::with_rows(vec![vec![String::new(); 5]; 3]),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let engine = SyncEngine::open(table, EditableRange::default()).unwrap();
        (engine, entered_rx, release_tx)
    }

    #[test]
    fn test_edits_during_flush_land_in_next_batch() {
        let (engine, entered, release) = gated();
        let handle = engine.handle();
        let first = Coord::new(0, 1);
        let later = Coord::new(1, 1);
        engine.update_cell(first, "a").unwrap();

        thread::scope(|s| {
            let flushing = s.spawn(|| engine.flush());

            assert_eq!(entered.recv().unwrap(), first);
            handle.update_cell(later, "b").unwrap();
            release.send(()).unwrap();

            let result = flushing.join().unwrap();
            assert_eq!(result.succeeded, 1);
        });

        assert!(engine.get_pending(first).is_none());
        assert_eq!(engine.get_pending(later).unwrap().status, Status::Pending);
    }

    #[test]
    fn test_reedit_of_inflight_cell_survives_success() {
        let (engine, entered, release) = gated();
        let handle = engine.handle();
        let c = Coord::new(2, 2);
        engine.update_cell(c, "old").unwrap();

        thread::scope(|s| {
            let flushing = s.spawn(|| engine.flush());
            entered.recv().unwrap();
            handle.update_cell(c, "new").unwrap();
            release.send(()).unwrap();
            flushing.join().unwrap();
        });

        let entry = engine.get_pending(c).unwrap();
        assert_eq!(entry.value, "new");
        assert_eq!(entry.status, Status::Pending);
        assert_eq!(engine.cached(c), "old");
        assert_eq!(engine.display()[2][2], "new");
    }
}
