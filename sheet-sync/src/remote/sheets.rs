//! Google Sheets API v4 backend.
//!
//! Values are written with `valueInputOption=USER_ENTERED`, so formulas
//! such as `=TIME(9, 30, 00)` are evaluated by the service rather than
//! stored as text.
//!
//! IDs ending in `-isc` name an uploaded Excel file. Opening one copies it
//! into a new spreadsheet through the Drive API and edits the copy.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{RemoteError, RemoteTable};
use crate::coord::Coord;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
const EXCEL_SUFFIX: &str = "-isc";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of a currently valid OAuth access token. Acquisition and
/// refresh live outside this crate.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Result<String, RemoteError>;
}

pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Result<String, RemoteError> {
        Ok(self.0.clone())
    }
}

pub struct SheetsTable<T: TokenProvider> {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
    token: T,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct DriveFile {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl<T: TokenProvider> SheetsTable<T> {
    /// Connects to `spreadsheet_id`. With no `worksheet`, the first tab is
    /// used.
    pub fn open(spreadsheet_id: &str, worksheet: Option<&str>, token: T) -> Result<Self, RemoteError> {
        Self::open_at(DEFAULT_BASE_URL, DEFAULT_DRIVE_URL, spreadsheet_id, worksheet, token)
    }

    pub fn open_at(
        base_url: &str,
        drive_url: &str,
        spreadsheet_id: &str,
        worksheet: Option<&str>,
        token: T,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let spreadsheet_id = match excel_file_id(spreadsheet_id) {
            Some(file_id) => convert_to_spreadsheet(&client, drive_url, file_id, &token)?,
            None => spreadsheet_id.to_string(),
        };

        let mut table = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id,
            worksheet: String::new(),
            token,
        };

        let titles = table.worksheets()?;
        table.worksheet = match worksheet {
            Some(title) if titles.iter().any(|t| t == title) => title.to_string(),
            Some(title) => return Err(RemoteError::NotFound(format!("worksheet '{}'", title))),
            None => titles
                .into_iter()
                .next()
                .ok_or_else(|| RemoteError::NotFound(format!("no worksheets in {}", table.spreadsheet_id)))?,
        };

        tracing::info!(spreadsheet = %table.spreadsheet_id, worksheet = %table.worksheet, "opened spreadsheet");
        Ok(table)
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    /// Titles of every tab in the spreadsheet, in display order.
    pub fn worksheets(&self) -> Result<Vec<String>, RemoteError> {
        let mut url = self.spreadsheet_url()?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");

        let response = self.send(self.client.get(url))?;
        let meta: SpreadsheetMeta = response
            .json()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    /// Points this table at another tab of the same spreadsheet. Left
    /// unchanged if the tab does not exist.
    pub fn select_worksheet(&mut self, title: &str) -> Result<(), RemoteError> {
        let titles = self.worksheets()?;
        if !titles.iter().any(|t| t == title) {
            return Err(RemoteError::NotFound(format!("worksheet '{}'", title)));
        }
        self.worksheet = title.to_string();
        tracing::info!(worksheet = %self.worksheet, "switched worksheet");
        Ok(())
    }

    fn spreadsheet_url(&self) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RemoteError::Network(format!("bad base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Network(format!("bad base url {}", self.base_url)))?
            .push(&self.spreadsheet_id);
        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<Url, RemoteError> {
        let mut url = self.spreadsheet_url()?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Network(format!("bad base url {}", self.base_url)))?
            .push("values")
            .push(range);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        send(&self.token, request)
    }
}

fn send<T: TokenProvider>(token: &T, request: RequestBuilder) -> Result<Response, RemoteError> {
    let response = request
        .bearer_auth(token.access_token()?)
        .send()
        .map_err(|e| RemoteError::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(status, &body))
}

/// The Drive file behind an Excel-style ID, if it is one.
fn excel_file_id(id: &str) -> Option<&str> {
    id.strip_suffix(EXCEL_SUFFIX).filter(|file_id| !file_id.is_empty())
}

fn drive_url(drive_url: &str, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(drive_url)
        .map_err(|e| RemoteError::Network(format!("bad drive url {}: {}", drive_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| RemoteError::Network(format!("bad drive url {}", drive_url)))?
        .extend(segments);
    Ok(url)
}

fn parse_drive_file(body: &str) -> Result<DriveFile, RemoteError> {
    serde_json::from_str(body)
        .map_err(|e| RemoteError::Api { status: 200, message: format!("malformed drive file: {}", e) })
}

fn copy_request(name: &str) -> Value {
    json!({ "name": format!("{} (Converted)", name), "mimeType": SPREADSHEET_MIME_TYPE })
}

/// Copies an uploaded Excel file into spreadsheet format. Returns the ID
/// of the copy.
fn convert_to_spreadsheet<T: TokenProvider>(
    client: &Client,
    base: &str,
    file_id: &str,
    token: &T,
) -> Result<String, RemoteError> {
    let mut url = drive_url(base, &[file_id])?;
    url.query_pairs_mut().append_pair("fields", "name");
    let body = send(token, client.get(url))?
        .text()
        .map_err(|e| RemoteError::Network(e.to_string()))?;
    let original = parse_drive_file(&body)?;

    let url = drive_url(base, &[file_id, "copy"])?;
    let body = send(token, client.post(url).json(&copy_request(&original.name)))?
        .text()
        .map_err(|e| RemoteError::Network(e.to_string()))?;
    let copy = parse_drive_file(&body)?;
    if copy.id.is_empty() {
        return Err(RemoteError::Api { status: 200, message: "drive copy returned no id".into() });
    }

    tracing::info!(file_id, spreadsheet = %copy.id, name = %original.name, "converted excel file");
    Ok(copy.id)
}

impl<T: TokenProvider> RemoteTable for SheetsTable<T> {
    fn read_all(&self) -> Result<Vec<Vec<String>>, RemoteError> {
        let url = self.values_url(&quote_title(&self.worksheet))?;
        let response = self.send(self.client.get(url))?;
        let body = response.text().map_err(|e| RemoteError::Network(e.to_string()))?;
        parse_value_range(&body)
    }

    fn write_cell(&self, coord: Coord, value: &str) -> Result<(), RemoteError> {
        let range = cell_range(&self.worksheet, coord);
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");

        let body = json!({ "range": range, "majorDimension": "ROWS", "values": [[value]] });
        self.send(self.client.put(url).json(&body))?;
        tracing::debug!(cell = %coord, "wrote cell");
        Ok(())
    }

    fn append_row(&self, values: &[String]) -> Result<(), RemoteError> {
        let range = format!("{}!A1:append", quote_title(&self.worksheet));
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = json!({ "majorDimension": "ROWS", "values": [values] });
        self.send(self.client.post(url).json(&body))?;
        tracing::debug!(width = values.len(), "appended row");
        Ok(())
    }
}

/// `Sheet 1` → `'Sheet 1'`, with embedded quotes doubled.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_range(worksheet: &str, coord: Coord) -> String {
    format!("{}!{}", quote_title(worksheet), coord.to_a1())
}

fn parse_value_range(body: &str) -> Result<Vec<Vec<String>>, RemoteError> {
    let range: ValueRange = serde_json::from_str(body)
        .map_err(|e| RemoteError::Api { status: 200, message: format!("malformed value range: {}", e) })?;

    Ok(range
        .values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => RemoteError::Auth(message),
        404 => RemoteError::NotFound(message),
        429 => RemoteError::RateLimited,
        400 => RemoteError::InvalidRange(message),
        code => RemoteError::Api { status: code, message },
    }
}
