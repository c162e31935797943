//! Spreadsheet store backed by the Google Sheets REST API (v4)

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::google_auth::TokenSource;
use crate::range::{CellRef, ColumnRange, col_to_letter, quote_sheet};
use crate::store::{RangeValues, SheetStore};

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

/// Cells come back as strings with the default render option, but numbers
/// and booleans are accepted too.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn into_rows(values: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect()
}

/// Map a non-success answer to a store error
fn classify(status: reqwest::StatusCode, body: String) -> StoreError {
    let code = status.as_u16();
    match code {
        401 | 403 => StoreError::Auth(body),
        404 => StoreError::NotFound(body),
        // A worksheet title that does not exist surfaces as an unparsable range.
        400 if body.contains("Unable to parse range") => StoreError::NotFound(body),
        _ => StoreError::Api {
            status: code,
            message: body,
        },
    }
}

/// One opened spreadsheet
pub struct GoogleSheets {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    base: String,
    spreadsheet_id: String,
}

impl GoogleSheets {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenSource::new(config.token_path.clone(), http.clone()));
        GoogleSheets {
            http,
            tokens,
            base: config.sheets_api.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let token = self.tokens.access_token().await?;
        let resp = request.bearer_auth(token).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify(status, body))
    }

    async fn get_range(&self, range: String, major: &str) -> Result<ValueRange, StoreError> {
        let resp = self
            .send(
                self.http
                    .get(self.values_url(&range))
                    .query(&[("majorDimension", major)]),
            )
            .await?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn worksheet_titles(&self) -> Result<Vec<String>, StoreError> {
        let resp = self
            .send(
                self.http
                    .get(self.spreadsheet_url())
                    .query(&[("fields", "sheets.properties.title")]),
            )
            .await?;
        let meta: SpreadsheetMeta = resp.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn column_values(&self, sheet: &str, column: u16) -> Result<Vec<String>, StoreError> {
        let letter = col_to_letter(column);
        let range = format!("{}!{}:{}", quote_sheet(sheet), letter, letter);
        let values = self.get_range(range, "COLUMNS").await?;
        Ok(into_rows(values.values).into_iter().next().unwrap_or_default())
    }

    async fn cell_value(&self, sheet: &str, cell: CellRef) -> Result<Option<String>, StoreError> {
        let range = format!("{}!{}", quote_sheet(sheet), cell);
        let values = self.get_range(range, "ROWS").await?;
        Ok(into_rows(values.values)
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .filter(|v| !v.is_empty()))
    }

    async fn batch_get(
        &self,
        sheet: &str,
        ranges: &[ColumnRange],
    ) -> Result<Vec<RangeValues>, StoreError> {
        let mut query: Vec<(&str, String)> = ranges
            .iter()
            .map(|r| ("ranges", r.qualified(sheet)))
            .collect();
        query.push(("majorDimension", "ROWS".to_string()));

        let resp = self
            .send(
                self.http
                    .get(format!("{}/values:batchGet", self.spreadsheet_url()))
                    .query(&query),
            )
            .await?;
        let batch: BatchGetResponse = resp.json().await?;
        if batch.value_ranges.len() != ranges.len() {
            return Err(StoreError::Malformed(format!(
                "asked for {} ranges, got {}",
                ranges.len(),
                batch.value_ranges.len()
            )));
        }
        Ok(batch
            .value_ranges
            .into_iter()
            .map(|vr| into_rows(vr.values))
            .collect())
    }

    async fn update_cell(&self, sheet: &str, cell: CellRef, value: &str) -> Result<(), StoreError> {
        let range = format!("{}!{}", quote_sheet(sheet), cell);
        self.send(
            self.http
                .put(self.values_url(&range))
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&serde_json::json!({ "values": [[value]] })),
        )
        .await?;
        Ok(())
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        let range = format!("{}!A1", quote_sheet(sheet));
        self.send(
            self.http
                .post(format!("{}:append", self.values_url(&range)))
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&serde_json::json!({ "values": [row] })),
        )
        .await?;
        Ok(())
    }
}
