//! Command-line argument parsing
//!
//! Supports:
//! - Opening a sheet by ID or `@shortcut`
//! - Registering and listing shortcuts
//! - Picking the worksheet and editable columns up front

use clap::Parser;

/// Keyboard-driven editor for Google Sheets
#[derive(Parser, Debug)]
#[command(name = "gsheet", version, about = "Edit Google Sheets from the terminal")]
pub struct CliArgs {
    /// Spreadsheet ID or @shortcut to open
    #[arg(value_name = "SHEET", required_unless_present_any = ["add", "list"])]
    pub sheet: Option<String>,

    /// Register a shortcut for a spreadsheet ID
    #[arg(long, num_args = 2, value_names = ["NAME", "SHEET_ID"], conflicts_with_all = ["sheet", "list"])]
    pub add: Option<Vec<String>>,

    /// List registered shortcuts
    #[arg(long, conflicts_with = "sheet")]
    pub list: bool,

    /// Worksheet (tab) to open instead of the first one
    #[arg(short = 'w', long, value_name = "TITLE")]
    pub worksheet: Option<String>,

    /// Editable columns, e.g. "B:E" (overrides the config)
    #[arg(short = 'c', long, value_name = "RANGE")]
    pub columns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddShortcut { name: String, sheet_id: String },
    ListShortcuts,
    Open {
        sheet: String,
        worksheet: Option<String>,
        columns: Option<String>,
    },
}

impl CliArgs {
    pub fn into_command(self) -> Result<Command, String> {
        if let Some(add) = self.add {
            let [name, sheet_id]: [String; 2] = add
                .try_into()
                .map_err(|_| "--add requires a name and a sheet ID".to_string())?;
            return Ok(Command::AddShortcut { name, sheet_id });
        }
        if self.list {
            return Ok(Command::ListShortcuts);
        }
        match self.sheet {
            Some(sheet) => Ok(Command::Open {
                sheet,
                worksheet: self.worksheet,
                columns: self.columns,
            }),
            None => Err("No sheet given".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        let args = CliArgs::try_parse_from(std::iter::once("gsheet").chain(args.iter().copied()))
            .map_err(|e| e.to_string())?;
        args.into_command()
    }

    #[test]
    fn test_open_by_id() {
        assert_eq!(
            parse(&["1t54f4aRu9kQ"]).unwrap(),
            Command::Open { sheet: "1t54f4aRu9kQ".into(), worksheet: None, columns: None }
        );
    }

    #[test]
    fn test_open_with_options() {
        assert_eq!(
            parse(&["@timesheet", "-w", "Week 2", "--columns", "C:F"]).unwrap(),
            Command::Open {
                sheet: "@timesheet".into(),
                worksheet: Some("Week 2".into()),
                columns: Some("C:F".into()),
            }
        );
    }

    #[test]
    fn test_add_shortcut() {
        assert_eq!(
            parse(&["--add", "ts", "abc"]).unwrap(),
            Command::AddShortcut { name: "ts".into(), sheet_id: "abc".into() }
        );
        assert!(parse(&["--add", "ts"]).is_err());
    }

    #[test]
    fn test_list() {
        assert_eq!(parse(&["--list"]).unwrap(), Command::ListShortcuts);
    }

    #[test]
    fn test_sheet_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--list", "abc"]).is_err());
    }
}
