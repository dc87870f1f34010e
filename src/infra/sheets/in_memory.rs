// In-memory implementation of SheetStore. Rows live in a Vec so append
// order is preserved exactly like spreadsheet row order.
#![allow(dead_code)]

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::activity::{ActivityError, SheetStore};

pub struct InMemorySheetStore {
    rows: RwLock<Vec<Vec<String>>>,
    /// When set, every call fails with this message.
    fail_with: Option<String>,
}

impl InMemorySheetStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn seeded(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: RwLock::new(rows),
            fail_with: None,
        }
    }

    /// A store whose every call fails, for exercising error paths.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.read().await.clone()
    }

    fn check_failure(&self) -> Result<(), ActivityError> {
        match &self.fail_with {
            Some(message) => Err(ActivityError::Remote(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for InMemorySheetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetStore for InMemorySheetStore {
    async fn append_row(
        &self,
        _access_token: &str,
        row: Vec<String>,
    ) -> Result<serde_json::Value, ActivityError> {
        self.check_failure()?;
        let mut rows = self.rows.write().await;
        rows.push(row);
        Ok(serde_json::json!({
            "updates": { "updatedRows": 1 },
            "tableRange": format!("Sheet1!A1:D{}", rows.len()),
        }))
    }

    async fn read_rows(
        &self,
        _access_token: &str,
        limit: usize,
    ) -> Result<Vec<Vec<String>>, ActivityError> {
        self.check_failure()?;
        let rows = self.rows.read().await;
        Ok(rows.iter().take(limit).cloned().collect())
    }
}
