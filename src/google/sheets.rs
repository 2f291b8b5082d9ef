use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::google::service_account::ServiceAccount;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// A1 range covering a whole worksheet, quoted so any title works.
pub fn sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// Worksheet reads and writes on one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    auth: Arc<ServiceAccount>,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, auth: Arc<ServiceAccount>, spreadsheet_id: String) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id,
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> AppResult<Url> {
        let mut url = Url::parse(SHEETS_BASE)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("sheets base url cannot be a base".into()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    async fn check(response: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::UpstreamUnavailable(format!(
            "{what} returned {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }

    /// Every formatted value in the worksheet, header row included.
    pub async fn read_all(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        debug!(sheet, "Reading worksheet");
        let token = self.auth.access_token().await?;
        let url = self.values_url(&sheet_range(sheet), "")?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let range: ValueRange = Self::check(response, &format!("reading '{sheet}'"))
            .await?
            .json()
            .await?;
        Ok(range.values)
    }

    pub async fn clear(&self, sheet: &str) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let url = self.values_url(&sheet_range(sheet), ":clear")?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response, &format!("clearing '{sheet}'")).await?;
        Ok(())
    }

    /// Writes rows from A1 down, letting the sheet parse values as typed input.
    pub async fn write_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let range = format!("{}!A1", sheet_range(sheet));
        let mut url = self.values_url(&range, "")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await?;
        Self::check(response, &format!("updating '{sheet}'")).await?;

        info!(sheet, rows = rows.len(), "Worksheet updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_quoted() {
        assert_eq!(sheet_range("社員一覧"), "'社員一覧'");
        assert_eq!(sheet_range("Bob's"), "'Bob''s'");
    }
}
