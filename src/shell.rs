//! Line-oriented interaction shell
//!
//! Reads one command per line, turns it into edit intents on the
//! [`SyncEngine`], and prints the table with unflushed cells marked.
//! Nothing is written to the remote until `flush` or `q`.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use sheet_sync::{
    column_letters, current_time_formula, split_row_input, Coord, FlushResult, Journal, RemoteError,
    RemoteTable, SheetsTable, Status, SyncEngine, TokenProvider,
};

/// A remote table that is one tab of a larger spreadsheet.
pub trait Workbook: RemoteTable {
    fn worksheet_titles(&self) -> Result<Vec<String>, RemoteError>;
    fn select_worksheet(&mut self, title: &str) -> Result<(), RemoteError>;
    fn current_worksheet(&self) -> &str;
    /// Where this tab's unflushed edits are journaled.
    fn journal_key(&self) -> String;
}

impl<T: TokenProvider> Workbook for SheetsTable<T> {
    fn worksheet_titles(&self) -> Result<Vec<String>, RemoteError> {
        self.worksheets()
    }

    fn select_worksheet(&mut self, title: &str) -> Result<(), RemoteError> {
        SheetsTable::select_worksheet(self, title)
    }

    fn current_worksheet(&self) -> &str {
        self.worksheet()
    }

    fn journal_key(&self) -> String {
        format!("{}:{}", self.spreadsheet_id(), self.worksheet())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cmd {
    Show,
    Set(Coord, String),
    Edit(usize, Vec<String>),
    Append(Vec<String>),
    Time(Coord),
    Flush,
    Refresh,
    Pending,
    Sheets,
    Switch(String),
    Save,
    Discard,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
Commands:
  show, s                 print the table (* unflushed, ! failed)
  set CELL VALUE          change one cell, e.g. set C4 7.5
  edit ROW V1,V2,...      fill a row across the editable columns
  append V1,V2,...        add a row below the table
  time CELL               put the current time in a cell
  flush, w                send queued edits
  refresh                 re-read the sheet, keeping queued edits
  pending                 list queued edits
  sheets                  list worksheets
  switch TITLE            open another worksheet
  q                       flush and quit
  Q                       quit, dropping queued edits
  help                    this text";

fn parse_command(line: &str) -> Result<Option<Cmd>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let cmd = match name {
        "show" | "s" => Cmd::Show,
        "set" => {
            let (cell, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if cell.is_empty() {
                bail!("usage: set CELL VALUE");
            }
            Cmd::Set(cell.parse()?, value.trim().to_string())
        }
        "edit" => {
            let (row, values) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let row: usize = row.parse().context("usage: edit ROW V1,V2,...")?;
            if row == 0 {
                bail!("rows are numbered from 1");
            }
            Cmd::Edit(row - 1, split_row_input(values))
        }
        "append" => Cmd::Append(split_row_input(rest)),
        "time" => {
            if rest.is_empty() {
                bail!("usage: time CELL");
            }
            Cmd::Time(rest.parse()?)
        }
        "flush" | "w" => Cmd::Flush,
        "refresh" => Cmd::Refresh,
        "pending" => Cmd::Pending,
        "sheets" => Cmd::Sheets,
        "switch" => {
            if rest.is_empty() {
                bail!("usage: switch TITLE");
            }
            Cmd::Switch(rest.to_string())
        }
        "q" => Cmd::Save,
        "Q" => Cmd::Discard,
        "help" | "?" => Cmd::Help,
        other => bail!("unknown command '{}', try help", other),
    };
    Ok(Some(cmd))
}

/// Column-aligned table with 1-based row numbers and lettered headers.
/// `marks` decorate individual cells.
fn render(view: &[Vec<String>], marks: &BTreeMap<Coord, char>) -> String {
    let width = view.iter().map(Vec::len).max().unwrap_or(0);
    let cell = |coord: Coord| -> String {
        let value = view
            .get(coord.row)
            .and_then(|r| r.get(coord.col))
            .map_or("", String::as_str);
        match marks.get(&coord) {
            Some(mark) => format!("{}{}", value, mark),
            None => value.to_string(),
        }
    };

    let mut widths: Vec<usize> = (0..width).map(|c| column_letters(c).len()).collect();
    for row in 0..view.len() {
        for (col, w) in widths.iter_mut().enumerate() {
            *w = (*w).max(cell(Coord::new(row, col)).chars().count());
        }
    }
    let gutter = view.len().to_string().len();

    let mut out = format!("{:>gutter$}", "");
    for (col, w) in widths.iter().enumerate() {
        out.push_str(&format!("  {:<w$}", column_letters(col)));
    }
    out.push('\n');
    for row in 0..view.len() {
        out.push_str(&format!("{:>gutter$}", row + 1));
        for (col, w) in widths.iter().enumerate() {
            out.push_str(&format!("  {:<w$}", cell(Coord::new(row, col))));
        }
        out.push('\n');
    }
    out
}

fn report(result: &FlushResult) -> String {
    if result.is_noop() {
        return "nothing to flush".to_string();
    }
    let mut out = format!("flushed {} cells in {} calls", result.succeeded, result.calls);
    if !result.is_clean() {
        out.push_str(&format!(", {} failed (still queued):", result.failed));
        for failure in &result.failures {
            out.push_str(&format!("\n  {}: {}", failure.coord, failure.message()));
        }
    }
    out
}

pub struct Shell<R: Workbook> {
    engine: SyncEngine<R>,
    journal: Option<Box<dyn Journal>>,
}

impl<R: Workbook> Shell<R> {
    pub fn new(engine: SyncEngine<R>, journal: Option<Box<dyn Journal>>) -> Self {
        Self { engine, journal }
    }

    pub fn engine(&self) -> &SyncEngine<R> {
        &self.engine
    }

    /// Re-queues edits a previous session left behind for the current tab.
    pub fn restore_journal(&mut self) -> Result<usize> {
        let key = self.engine.remote().journal_key();
        match self.journal.as_deref_mut() {
            Some(journal) => Ok(self.engine.restore_pending(journal, &key)?),
            None => Ok(0),
        }
    }

    fn persist_journal(&mut self) -> Result<usize> {
        let key = self.engine.remote().journal_key();
        match self.journal.as_deref_mut() {
            Some(journal) => Ok(self.engine.persist_pending(journal, &key)?),
            None => Ok(0),
        }
    }

    /// Runs until `q`, `Q` or end of input. End of input behaves like `q`.
    pub fn run<I: BufRead, W: Write>(&mut self, input: I, out: &mut W) -> Result<()> {
        let restored = self.restore_journal()?;
        if restored > 0 {
            writeln!(out, "restored {} unflushed edits from last session", restored)?;
        }
        self.execute("show", out)?;

        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                self.execute("q", out)?;
                return Ok(());
            };
            let line = line.context("Failed to read input")?;

            match self.execute(&line, out) {
                Ok(Flow::Quit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(out, "error: {:#}", e)?,
            }
        }
    }

    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let Some(cmd) = parse_command(line)? else {
            return Ok(Flow::Continue);
        };
        tracing::trace!(?cmd, "shell command");

        match cmd {
            Cmd::Show => {
                let marks: BTreeMap<Coord, char> = self
                    .engine
                    .pending()
                    .into_iter()
                    .map(|c| (c.coord, if c.status == Status::Failed { '!' } else { '*' }))
                    .collect();
                write!(out, "{}", render(&self.engine.display(), &marks))?;
            }
            Cmd::Set(coord, value) => {
                self.engine.update_cell(coord, value)?;
            }
            Cmd::Edit(row, values) => {
                let range = self.engine.range();
                if values.len() > range.width() {
                    bail!("{} values given, only {} columns ({}) are editable", values.len(), range.width(), range);
                }
                let view = self.engine.display();
                match view.get(row) {
                    Some(current) => {
                        for (col, value) in range.columns().zip(values) {
                            if current.get(col).map_or("", String::as_str) != value {
                                self.engine.update_cell(Coord::new(row, col), value)?;
                            }
                        }
                    }
                    None => {
                        let target = self.append(values)?;
                        writeln!(out, "queued as new row {}", target + 1)?;
                    }
                }
            }
            Cmd::Append(values) => {
                let range = self.engine.range();
                if values.len() > range.width() {
                    bail!("{} values given, only {} columns ({}) are editable", values.len(), range.width(), range);
                }
                let target = self.append(values)?;
                writeln!(out, "queued row {}", target + 1)?;
            }
            Cmd::Time(coord) => {
                let formula = current_time_formula();
                if coord.row < self.engine.display().len() {
                    self.engine.update_cell(coord, formula)?;
                } else {
                    let target = self.engine.append_row([(coord.col, formula)])?;
                    writeln!(out, "queued as new row {}", target + 1)?;
                }
            }
            Cmd::Flush => {
                let result = self.engine.flush();
                writeln!(out, "{}", report(&result))?;
                if let Err(e) = result.into_result() {
                    tracing::warn!(error = %e, "flush incomplete");
                }
            }
            Cmd::Refresh => {
                self.engine.refresh()?;
                writeln!(out, "{} rows", self.engine.row_count())?;
            }
            Cmd::Pending => {
                let pending = self.engine.pending();
                if pending.is_empty() {
                    writeln!(out, "no queued edits")?;
                }
                for change in pending {
                    let status = match change.status {
                        Status::Pending => "pending",
                        Status::InFlight => "sending",
                        Status::Failed => "failed",
                    };
                    writeln!(out, "  {:<6} {:<8} {:<7} {}", change.coord, status, change.origin.as_str(), change.value)?;
                }
            }
            Cmd::Sheets => {
                let remote = self.engine.remote();
                for title in remote.worksheet_titles()? {
                    let marker = if title == remote.current_worksheet() { '*' } else { ' ' };
                    writeln!(out, "{} {}", marker, title)?;
                }
            }
            Cmd::Switch(title) => {
                self.engine
                    .switch_session(|remote| remote.select_worksheet(&title))?;
                let restored = self.restore_journal()?;
                if restored > 0 {
                    writeln!(out, "restored {} unflushed edits", restored)?;
                }
                self.execute("show", out)?;
            }
            Cmd::Save => {
                let result = self.engine.flush();
                if !result.is_noop() {
                    writeln!(out, "{}", report(&result))?;
                }
                if let Err(e) = result.into_result() {
                    tracing::warn!(error = %e, "quitting with unsaved edits");
                }
                let kept = self.persist_journal()?;
                if kept > 0 {
                    writeln!(out, "{} edits kept for next session", kept)?;
                } else if self.engine.has_unflushed() {
                    writeln!(out, "warning: {} edits were not saved", self.engine.pending_count())?;
                }
                return Ok(Flow::Quit);
            }
            Cmd::Discard => {
                let dropped = self.engine.pending_count();
                if dropped > 0 {
                    tracing::info!(dropped, "quit without flushing");
                    writeln!(out, "dropped {} queued edits", dropped)?;
                }
                return Ok(Flow::Quit);
            }
            Cmd::Help => writeln!(out, "{}", HELP)?,
        }
        Ok(Flow::Continue)
    }

    /// Values map onto the editable columns in order; blanks are skipped.
    fn append(&self, values: Vec<String>) -> Result<usize> {
        let cells: Vec<(usize, String)> = self
            .engine
            .range()
            .columns()
            .zip(values)
            .filter(|(_, v)| !v.is_empty())
            .collect();
        if cells.is_empty() {
            bail!("nothing to append");
        }
        Ok(self.engine.append_row(cells)?)
    }
}
