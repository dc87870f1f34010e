// Activity logging business logic. Notice how this module has NO HTTP or
// Google-specific code (no axum, no reqwest imports). It works with plain
// strings and a storage trait, so the sheet backend can be swapped out
// without touching the domain rules.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// One logged activity, as it appears in the spreadsheet.
///
/// Exactly four string columns in fixed order: day, date, time, activity.
/// Rows are immutable once written; ordering is append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub day: String,
    pub date: String,
    pub time: String,
    pub activity: String,
}

impl ActivityRecord {
    /// Builds a record from the wall clock at log time.
    /// `day` is the full weekday name, `time` is 12-hour with AM/PM,
    /// matching the column format the sheet has always used.
    pub fn at(now: DateTime<Local>, activity: impl Into<String>) -> Self {
        Self {
            day: now.format("%A").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%I:%M:%S %p").to_string(),
            activity: activity.into(),
        }
    }

    /// The row as it is sent to the sheet, in column order.
    pub fn into_row(self) -> Vec<String> {
        vec![self.day, self.date, self.time, self.activity]
    }

    /// Parses a fetched row. Rows with fewer than 4 columns are not an
    /// error; they are skipped by the caller.
    fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < 4 {
            return None;
        }
        Some(Self {
            day: row[0].clone(),
            date: row[1].clone(),
            time: row[2].clone(),
            activity: row[3].clone(),
        })
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by the activity workflow.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Sheets API error: {0}")]
    Remote(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for the remote sheet the records live in.
///
/// The core defines WHAT it needs (append a row, read a range); the infra
/// layer provides the actual Google Sheets client. An in-memory
/// implementation backs the tests.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Appends one row after the existing rows. Returns the upstream
    /// append result as-is; callers treat it as opaque.
    async fn append_row(
        &self,
        access_token: &str,
        row: Vec<String>,
    ) -> Result<serde_json::Value, ActivityError>;

    /// Reads up to `limit` data rows in sheet order, oldest first.
    /// Sheet row 1 is the header and is never included.
    async fn read_rows(
        &self,
        access_token: &str,
        limit: usize,
    ) -> Result<Vec<Vec<String>>, ActivityError>;
}

// ============================================================================
// SERVICE
// ============================================================================

/// The activity gateway: builds timestamped rows and delegates to the store.
pub struct ActivityService<S: SheetStore> {
    store: S,
}

impl<S: SheetStore> ActivityService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Appends one activity row stamped with `now`.
    ///
    /// The activity text is taken as-is: empty strings are accepted and
    /// there is no length limit.
    pub async fn log(
        &self,
        access_token: &str,
        activity: &str,
        now: DateTime<Local>,
    ) -> Result<serde_json::Value, ActivityError> {
        let record = ActivityRecord::at(now, activity);
        let result = self.store.append_row(access_token, record.into_row()).await?;
        tracing::info!(activity, "Logged activity to sheet");
        Ok(result)
    }

    /// Returns at most `limit` records in sheet order (oldest appended
    /// first). Rows with fewer than 4 columns are dropped silently.
    pub async fn recent(
        &self,
        access_token: &str,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, ActivityError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = self.store.read_rows(access_token, limit).await?;
        Ok(rows
            .iter()
            .filter_map(|row| ActivityRecord::from_row(row))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::sync::Mutex;

    /// Test double that records appended rows and serves canned reads.
    struct FakeSheet {
        rows: Mutex<Vec<Vec<String>>>,
    }

    impl FakeSheet {
        fn with_rows(rows: Vec<Vec<String>>) -> Self {
            Self {
                rows: Mutex::new(rows),
            }
        }
    }

    #[async_trait]
    impl SheetStore for FakeSheet {
        async fn append_row(
            &self,
            _access_token: &str,
            row: Vec<String>,
        ) -> Result<serde_json::Value, ActivityError> {
            self.rows.lock().await.push(row);
            Ok(serde_json::json!({"updates": {"updatedRows": 1}}))
        }

        async fn read_rows(
            &self,
            _access_token: &str,
            limit: usize,
        ) -> Result<Vec<Vec<String>>, ActivityError> {
            let rows = self.rows.lock().await;
            Ok(rows.iter().take(limit).cloned().collect())
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn record_formats_timestamp_columns() {
        // 2024-03-18 was a Monday.
        let now = Local.with_ymd_and_hms(2024, 3, 18, 15, 4, 5).unwrap();
        let record = ActivityRecord::at(now, "Wrote tests");

        assert_eq!(record.day, "Monday");
        assert_eq!(record.date, "2024-03-18");
        assert_eq!(record.time, "03:04:05 PM");
        assert_eq!(record.activity, "Wrote tests");
    }

    #[test]
    fn record_row_order_is_day_date_time_activity() {
        let now = Local.with_ymd_and_hms(2024, 3, 18, 9, 30, 0).unwrap();
        let record = ActivityRecord::at(now, "Standup");

        assert_eq!(
            record.into_row(),
            row(&["Monday", "2024-03-18", "09:30:00 AM", "Standup"])
        );
    }

    #[tokio::test]
    async fn log_appends_exactly_one_row() {
        let sheet = FakeSheet::with_rows(vec![row(&[
            "Sunday",
            "2024-03-17",
            "11:00:00 AM",
            "Earlier entry",
        ])]);
        let service = ActivityService::new(sheet);

        let now = Local.with_ymd_and_hms(2024, 3, 18, 15, 4, 5).unwrap();
        service.log("token", "Wrote tests", now).await.unwrap();

        let rows = service.store.rows.lock().await.clone();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            row(&["Monday", "2024-03-18", "03:04:05 PM", "Wrote tests"])
        );
    }

    #[tokio::test]
    async fn log_accepts_empty_activity_text() {
        let service = ActivityService::new(FakeSheet::with_rows(Vec::new()));
        let now = Local.with_ymd_and_hms(2024, 3, 18, 15, 4, 5).unwrap();

        service.log("token", "", now).await.unwrap();

        let rows = service.store.rows.lock().await.clone();
        assert_eq!(rows[0][3], "");
    }

    #[tokio::test]
    async fn recent_skips_short_rows() {
        let service = ActivityService::new(FakeSheet::with_rows(vec![
            row(&["Monday", "2024-03-18", "09:00:00 AM", "First"]),
            row(&["Monday", "2024-03-18"]),
            row(&["Monday", "2024-03-18", "10:00:00 AM", "Second"]),
        ]));

        let records = service.recent("token", 10).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].activity, "First");
        assert_eq!(records[1].activity, "Second");
    }

    #[tokio::test]
    async fn recent_never_exceeds_limit() {
        let service = ActivityService::new(FakeSheet::with_rows(vec![
            row(&["Monday", "2024-03-18", "09:00:00 AM", "A"]),
            row(&["Monday", "2024-03-18", "10:00:00 AM", "B"]),
            row(&["Monday", "2024-03-18", "11:00:00 AM", "C"]),
        ]));

        let records = service.recent("token", 2).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].activity, "A");
        assert_eq!(records[1].activity, "B");
    }

    #[tokio::test]
    async fn recent_with_zero_limit_returns_empty() {
        let service = ActivityService::new(FakeSheet::with_rows(vec![row(&[
            "Monday",
            "2024-03-18",
            "09:00:00 AM",
            "A",
        ])]));

        let records = service.recent("token", 0).await.unwrap();
        assert!(records.is_empty());
    }
}
