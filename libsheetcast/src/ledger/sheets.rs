//! Google Sheets ledger backend
//!
//! The ledger document is located by title through the Drive API, the same
//! way `open("Social Scheduler")` works in the spreadsheet UI's API clients.
//! Reads fetch the whole worksheet as formatted strings; writes update one
//! A1 cell with `valueInputOption=RAW` so timestamps are stored verbatim.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::LedgerConfig;
use crate::credentials::GoogleCredentials;
use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Spreadsheet-backed ledger
pub struct SheetsLedger {
    client: Client,
    credentials: Arc<GoogleCredentials>,
    spreadsheet_id: String,
    worksheet: String,
}

impl SheetsLedger {
    /// Open the ledger document named in `config`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DocumentNotFound` when no spreadsheet with that
    /// title is shared with the service account, or when the configured
    /// worksheet does not exist.
    pub async fn open(
        client: Client,
        credentials: Arc<GoogleCredentials>,
        config: &LedgerConfig,
    ) -> Result<Self> {
        info!("Opening ledger '{}'", config.document);

        let token = credentials.access_token().await?;
        let spreadsheet_id = find_spreadsheet(&client, &token, &config.document).await?;
        let worksheet =
            select_worksheet(&client, &token, &spreadsheet_id, &config.worksheet).await?;

        info!("Ledger opened (worksheet '{}')", worksheet);
        Ok(Self {
            client,
            credentials,
            spreadsheet_id,
            worksheet,
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            SHEETS_BASE,
            self.spreadsheet_id,
            utf8_percent_encode(range, NON_ALPHANUMERIC)
        )
    }
}

#[async_trait]
impl LedgerStore for SheetsLedger {
    async fn read_values(&self) -> Result<Vec<Vec<String>>> {
        let token = self.credentials.access_token().await?;
        let url = self.values_url(&quote_sheet(&self.worksheet));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| LedgerError::Read(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Read(format!("HTTP {}: {}", status, text)).into());
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| LedgerError::Read(format!("bad values response: {}", e)))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn write_cell(&self, row: usize, column: usize, value: &str) -> Result<()> {
        let token = self.credentials.access_token().await?;
        let range = format!("{}!{}", quote_sheet(&self.worksheet), a1(row, column)?);
        debug!("Writing {} = {:?}", range, value);

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        let response = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&token)
            .json(&body)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| LedgerError::Write(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Write(format!("{}: HTTP {}: {}", range, status, text)).into());
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "sheets"
    }
}

async fn find_spreadsheet(client: &Client, token: &str, title: &str) -> Result<String> {
    let query = format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query(title),
        SPREADSHEET_MIME
    );

    let response = client
        .get(DRIVE_FILES_URL)
        .bearer_auth(token)
        .query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("pageSize", "10"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ])
        .timeout(HTTP_TIMEOUT)
        .send()
        .await
        .map_err(|e| LedgerError::Read(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(LedgerError::Read(format!("file lookup failed: HTTP {}: {}", status, text)).into());
    }

    let list: DriveFileList = response
        .json()
        .await
        .map_err(|e| LedgerError::Read(format!("bad file list: {}", e)))?;

    let file = list
        .files
        .into_iter()
        .find(|f| f.name == title)
        .ok_or_else(|| LedgerError::DocumentNotFound(title.to_string()))?;

    debug!("Ledger '{}' is spreadsheet {}", file.name, file.id);
    Ok(file.id)
}

async fn select_worksheet(
    client: &Client,
    token: &str,
    spreadsheet_id: &str,
    wanted: &str,
) -> Result<String> {
    let response = client
        .get(format!("{}/{}", SHEETS_BASE, spreadsheet_id))
        .bearer_auth(token)
        .query(&[("fields", "sheets.properties.title")])
        .timeout(HTTP_TIMEOUT)
        .send()
        .await
        .map_err(|e| LedgerError::Read(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(LedgerError::Read(format!("HTTP {}: {}", status, text)).into());
    }

    let spreadsheet: Spreadsheet = response
        .json()
        .await
        .map_err(|e| LedgerError::Read(format!("bad spreadsheet response: {}", e)))?;

    pick_worksheet(
        spreadsheet.sheets.into_iter().map(|s| s.properties.title).collect(),
        wanted,
    )
}

fn pick_worksheet(titles: Vec<String>, wanted: &str) -> Result<String> {
    if wanted.is_empty() {
        return titles
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::DocumentNotFound("spreadsheet has no sheets".to_string()).into());
    }

    titles
        .into_iter()
        .find(|t| t == wanted)
        .ok_or_else(|| LedgerError::DocumentNotFound(format!("worksheet '{}'", wanted)).into())
}

/// Escape a value for a Drive `q` string literal
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Quote a sheet title for use in an A1 range
fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Convert a 1-based column number to letters (1 = A, 27 = AA)
fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn a1(row: usize, column: usize) -> Result<String> {
    if row == 0 || column == 0 {
        return Err(LedgerError::Write(format!("invalid cell address ({}, {})", row, column)).into());
    }
    Ok(format!("{}{}", column_letters(column), row))
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
