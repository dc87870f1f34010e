use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::activity::{ActivityError, SheetStore};

/// Minimal Google Sheets v4 client. It deliberately exposes only the two
/// calls the core layer needs: append a row, read a row range.
pub struct SheetsApiClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    /// Full append range, e.g. `Sheet1!A:D`.
    range: String,
}

/// Response body of `values.get`. The `values` key is absent entirely when
/// the requested range is empty.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetsApiClient {
    pub fn new(spreadsheet_id: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        }
    }

    /// Range covering data rows 2..=limit+1 (row 1 is the header), on the
    /// same sheet as the append range.
    fn read_range(&self, limit: usize) -> String {
        let sheet = self.range.split('!').next().unwrap_or("Sheet1");
        format!("{}!A2:D{}", sheet, limit.saturating_add(1))
    }

    async fn into_remote_error(response: reqwest::Response) -> ActivityError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        ActivityError::Remote(format!("Sheets API returned {}: {}", status, text))
    }
}

#[async_trait]
impl SheetStore for SheetsApiClient {
    async fn append_row(
        &self,
        access_token: &str,
        row: Vec<String>,
    ) -> Result<serde_json::Value, ActivityError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base_url, self.spreadsheet_id, self.range
        );

        let response = self
            .client
            .post(&url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "values": [row] }))
            .send()
            .await
            .map_err(|err| ActivityError::Remote(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_remote_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|err| ActivityError::Remote(err.to_string()))
    }

    async fn read_rows(
        &self,
        access_token: &str,
        limit: usize,
    ) -> Result<Vec<Vec<String>>, ActivityError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            self.read_range(limit)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| ActivityError::Remote(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_remote_error(response).await);
        }

        let body: ValueRange = response
            .json()
            .await
            .map_err(|err| ActivityError::Remote(err.to_string()))?;
        Ok(body.values)
    }
}
