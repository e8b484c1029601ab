//! gsheet-tui: a keyboard-driven terminal editor for Google Sheets
//!
//! Edits are buffered locally by [`sheet_sync::SyncEngine`] and written in
//! batches on request. This crate carries everything around the engine:
//! command-line parsing, configuration, shortcuts, token lookup, logging
//! and the line-oriented [`shell::Shell`].

pub mod auth;
pub mod cli;
pub mod config;
pub mod config_paths;
pub mod logging;
pub mod shell;
pub mod shortcuts;
