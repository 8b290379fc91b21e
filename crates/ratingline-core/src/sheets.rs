//! Google Sheets v4 backend (values API, bearer token auth)

use std::time::Duration;

use reqwest::{Method, Url};
use serde_json::json;

use crate::error::FetchError;
use crate::http::HttpTransport;
use crate::sink::{SinkError, Tabular};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A spreadsheet addressed by id; destinations are worksheet titles.
pub struct SheetsTable<'a> {
    http: &'a HttpTransport,
    spreadsheet_id: String,
    token: String,
}

impl std::fmt::Debug for SheetsTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsTable")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl<'a> SheetsTable<'a> {
    pub fn new(http: &'a HttpTransport, spreadsheet_id: &str, token: &str) -> Self {
        Self {
            http,
            spreadsheet_id: spreadsheet_id.to_string(),
            token: token.to_string(),
        }
    }

    /// `.../spreadsheets/{id}/values/{range}{suffix}`
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SinkError> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| SinkError::new(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SinkError::new("invalid Sheets API base URL"))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: serde_json::Value,
    ) -> Result<(), SinkError> {
        self.http.block_on(async {
            let resp = self
                .http
                .client()
                .request(method, url)
                .bearer_auth(&self.token)
                .query(query)
                .timeout(REQUEST_TIMEOUT)
                .json(&body)
                .send()
                .await
                .map_err(|e| SinkError::new(FetchError::from_reqwest(e).to_string()))?;
            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(300).collect();
            Err(SinkError::new(format!("HTTP {}: {snippet}", status.as_u16())))
        })
    }
}

/// A1 range covering a whole worksheet
fn sheet_range(dest: &str) -> String {
    format!("'{}'", dest.replace('\'', "''"))
}

impl Tabular for SheetsTable<'_> {
    fn clear(&mut self, dest: &str) -> Result<(), SinkError> {
        let url = self.values_url(&sheet_range(dest), ":clear")?;
        self.send(Method::POST, url, &[], json!({}))
    }

    fn write_header(&mut self, dest: &str, header: &[&str]) -> Result<(), SinkError> {
        let range = format!("{}!A1", sheet_range(dest));
        let url = self.values_url(&range, "")?;
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": [header] });
        self.send(Method::PUT, url, &[("valueInputOption", "RAW")], body)
    }

    fn append_rows(&mut self, dest: &str, rows: &[Vec<String>]) -> Result<(), SinkError> {
        let range = format!("{}!A1", sheet_range(dest));
        let url = self.values_url(&range, ":append")?;
        let body = json!({ "majorDimension": "ROWS", "values": rows });
        self.send(
            Method::POST,
            url,
            &[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")],
            body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_quotes_title() {
        assert_eq!(sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(sheet_range("Bob's"), "'Bob''s'");
    }

    #[test]
    fn values_url_encodes_range() {
        let http = HttpTransport::new().unwrap();
        let table = SheetsTable::new(&http, "abc123", "token");
        let url = table.values_url("'Rating History'!A1", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Rating%20History'!A1:append"
        );
    }
}
