//! gsheet: edit a Google Sheet from the terminal
//!
//! ```text
//! gsheet <sheet_id>           open a sheet by ID
//! gsheet @<shortcut>          open a sheet by shortcut name
//! gsheet --add <name> <id>    register a shortcut
//! gsheet --list               list shortcuts
//! ```

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gsheet_tui::cli::{CliArgs, Command};
use gsheet_tui::config::AppConfig;
use gsheet_tui::shell::Shell;
use gsheet_tui::shortcuts::ShortcutRegistry;
use gsheet_tui::{auth, config_paths, logging};
use sheet_sync::{EditableRange, Journal, SheetsTable, SqliteJournal, SyncEngine};

fn main() -> ExitCode {
    logging::init();

    let args = CliArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %format!("{:#}", e), "fatal");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    match args.into_command().map_err(anyhow::Error::msg)? {
        Command::AddShortcut { name, sheet_id } => {
            let mut registry = ShortcutRegistry::load_default()?;
            registry.add(&name, &sheet_id)?;
            println!("Added shortcut '@{}' -> '{}'", name.trim_start_matches('@'), sheet_id);
        }
        Command::ListShortcuts => {
            let registry = ShortcutRegistry::load_default()?;
            if registry.is_empty() {
                println!("No shortcuts defined");
            } else {
                println!("Available shortcuts:");
                for (name, sheet_id) in registry.list() {
                    println!("  @{}: {}", name, sheet_id);
                }
            }
        }
        Command::Open { sheet, worksheet, columns } => {
            open(&sheet, worksheet.as_deref(), columns.as_deref())?;
        }
    }
    Ok(())
}

fn open(sheet: &str, worksheet: Option<&str>, columns: Option<&str>) -> Result<()> {
    let config = AppConfig::load();
    let range: EditableRange = match columns {
        Some(columns) => columns
            .parse()
            .with_context(|| format!("Bad --columns '{}'", columns))?,
        None => config.editable_range()?,
    };

    let sheet_id = ShortcutRegistry::load_default()?.resolve(sheet)?;
    let token = auth::access_token(&config)?;
    let table = SheetsTable::open(&sheet_id, worksheet, token)
        .with_context(|| format!("Failed to open sheet {}", sheet_id))?;
    let engine = SyncEngine::open(table, range).context("Failed to read sheet")?;

    let journal: Option<Box<dyn Journal>> = if config.journal {
        Some(Box::new(open_journal()?))
    } else {
        None
    };

    println!(
        "{} / {}, editable {} (type help for commands)",
        engine.remote().spreadsheet_id(),
        engine.remote().worksheet(),
        range
    );
    let mut shell = Shell::new(engine, journal);
    shell.run(io::stdin().lock(), &mut io::stdout())
}

fn open_journal() -> Result<SqliteJournal> {
    config_paths::ensure_config_dir()?;
    let path = config_paths::journal_file().context("No config directory available")?;
    SqliteJournal::open(&path.to_string_lossy())
        .with_context(|| format!("Failed to open journal {}", path.display()))
}
