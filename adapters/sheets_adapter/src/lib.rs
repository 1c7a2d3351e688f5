//! Google Sheets v4 backend: one worksheet read and overwritten as a whole.

use std::time::Duration;

use promptlog_core::domain::Table;
use promptlog_core::error::StoreError;
use promptlog_core::ports::TableStore;
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Identity of the worksheet and the credential used to reach it.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// OAuth bearer token with the spreadsheets scope.
    pub access_token: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl SheetsConfig {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

pub struct SheetsTableStore {
    config: SheetsConfig,
    client: Client,
}

impl SheetsTableStore {
    pub fn new(config: SheetsConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}`
    fn values_url(&self, range: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| format!("invalid base URL {}: {}", self.config.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| format!("invalid base URL {}", self.config.base_url))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.config.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    fn sheet(&self) -> String {
        quote_sheet_name(&self.config.worksheet)
    }

    fn anchor_range(&self) -> String {
        format!("{}!A1", self.sheet())
    }

    fn fetch_grid(&self) -> Result<Vec<Vec<String>>, String> {
        let mut url = self.values_url(&self.sheet())?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");

        debug!(%url, "sheets read");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .map_err(|e| format!("HTTP request failed: {}", e))?;
        let body = check_response(response)?;
        parse_values(&body)
    }

    fn clear(&self, range: &str) -> Result<(), String> {
        let url = self.values_url(&format!("{}:clear", range))?;
        debug!(%url, "sheets clear");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({}))
            .send()
            .map_err(|e| format!("HTTP request failed: {}", e))?;
        check_response(response).map(|_| ())
    }

    fn update(&self, grid: &[Vec<String>]) -> Result<(), String> {
        let range = self.anchor_range();
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        debug!(%url, rows = grid.len(), "sheets update");
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.config.access_token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": grid,
            }))
            .send()
            .map_err(|e| format!("HTTP request failed: {}", e))?;
        check_response(response).map(|_| ())
    }
}

/// Quotes a worksheet name for A1 notation so names with spaces or
/// punctuation still resolve. Embedded quotes are doubled.
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Column letters for a 1-based column index: 1 is `A`, 27 is `AA`.
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Rows below a grid of `rows` x `width`, open-ended downwards:
/// `'Sheet1'!A3:C` for a two-row, three-column grid.
fn trailing_range(sheet: &str, rows: usize, width: usize) -> String {
    format!("{}!A{}:{}", sheet, rows + 1, column_letter(width.max(1)))
}

/// Returns the body of a successful response, or the API's error message.
fn check_response(response: Response) -> Result<String, String> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| format!("Failed to read response: {}", e))?;
    if status.is_success() {
        return Ok(body);
    }
    Err(serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body)))
}

/// Converts a `ValueRange` body into a cell grid. A blank worksheet has no
/// `values` key at all. Non-string cells keep their JSON rendering.
pub fn parse_values(body: &str) -> Result<Vec<Vec<String>>, String> {
    let v: Value =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse response JSON: {}", e))?;
    let Some(rows) = v.get("values") else {
        return Ok(Vec::new());
    };
    let rows = rows
        .as_array()
        .ok_or_else(|| "`values` is not an array".to_string())?;

    rows.iter()
        .map(|row| -> Result<Vec<String>, String> {
            let cells = row
                .as_array()
                .ok_or_else(|| "row is not an array".to_string())?;
            Ok(cells
                .iter()
                .map(|cell| match cell {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect())
        })
        .collect()
}

impl TableStore for SheetsTableStore {
    fn read(&self) -> Result<Table, StoreError> {
        let grid = self.fetch_grid().map_err(StoreError::Read)?;
        debug!(worksheet = %self.config.worksheet, rows = grid.len(), "sheets read done");
        Ok(Table::from_grid(grid))
    }

    /// Writes the full grid from A1, then clears whatever is left below it.
    /// A failed overwrite leaves the previous contents in place. Once the
    /// overwrite has landed, a failed cleanup only leaves stale rows under
    /// the saved grid and is logged rather than reported.
    fn write(&self, table: &Table) -> Result<(), StoreError> {
        let grid = table.to_grid();
        if grid.is_empty() {
            return self.clear(&self.sheet()).map_err(StoreError::Write);
        }
        self.update(&grid).map_err(StoreError::Write)?;

        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let trailing = trailing_range(&self.sheet(), grid.len(), width);
        if let Err(e) = self.clear(&trailing) {
            warn!(range = %trailing, error = %e, "saved, but rows below the table were not cleared");
        }
        Ok(())
    }
}
