//! SQLite-backed status store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::StatusStore;
use crate::error::{MonitorError, Result};
use crate::types::DailyOutcome;
use crate::utils::format_day;

/// Status store persisted in a SQLite database.
///
/// Each call acquires a pooled connection for its own duration only.
#[derive(Clone)]
pub struct SqliteStatusStore {
    pool: SqlitePool,
}

impl SqliteStatusStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the
    /// connection fails, or schema creation fails.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MonitorError::Persistence(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        debug!(path = %path.display(), "status store opened");
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        // A single connection that never expires keeps the database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS mail_check_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mailbox_identifier TEXT NOT NULL,
                day TEXT NOT NULL,
                pattern_matched INTEGER NOT NULL DEFAULT 0,
                fail_pattern_matched INTEGER NOT NULL DEFAULT 0,
                last_check_time TEXT NOT NULL,
                last_received_time TEXT,
                last_matched_subject TEXT,
                last_failed_subject TEXT,
                UNIQUE(mailbox_identifier, day)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_mail_check_records_lookup
                ON mail_check_records(mailbox_identifier COLLATE NOCASE, day)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn get_for_day(
        &self,
        mailbox_name: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyOutcome>> {
        let row = sqlx::query(
            r"
            SELECT mailbox_identifier, day, pattern_matched, fail_pattern_matched,
                   last_check_time, last_received_time, last_matched_subject, last_failed_subject
            FROM mail_check_records
            WHERE mailbox_identifier = ? COLLATE NOCASE AND day = ?
            ORDER BY last_check_time DESC
            LIMIT 1
            ",
        )
        .bind(mailbox_name)
        .bind(format_day(day))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_outcome).transpose()
    }

    async fn upsert(&self, outcome: &DailyOutcome) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO mail_check_records
                (mailbox_identifier, day, pattern_matched, fail_pattern_matched,
                 last_check_time, last_received_time, last_matched_subject, last_failed_subject)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(mailbox_identifier, day) DO UPDATE SET
                pattern_matched = excluded.pattern_matched,
                fail_pattern_matched = excluded.fail_pattern_matched,
                last_check_time = excluded.last_check_time,
                last_received_time = excluded.last_received_time,
                last_matched_subject = excluded.last_matched_subject,
                last_failed_subject = excluded.last_failed_subject
            ",
        )
        .bind(&outcome.mailbox_name)
        .bind(format_day(outcome.day))
        .bind(outcome.pattern_matched)
        .bind(outcome.fail_pattern_matched)
        .bind(outcome.last_check_time.to_rfc3339())
        .bind(outcome.last_received_time.map(|t| t.to_rfc3339()))
        .bind(&outcome.last_matched_subject)
        .bind(&outcome.last_failed_subject)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Map a stored row back to an outcome; unreadable dates are an error.
fn row_to_outcome(row: &SqliteRow) -> Result<DailyOutcome> {
    let day_str: String = row.try_get("day")?;
    let checked_str: String = row.try_get("last_check_time")?;
    let received_str: Option<String> = row.try_get("last_received_time")?;

    let day = NaiveDate::parse_from_str(&day_str, "%Y-%m-%d").map_err(decode_error)?;
    let last_check_time = parse_utc(&checked_str)?;
    let last_received_time = received_str.as_deref().map(parse_utc).transpose()?;

    Ok(DailyOutcome {
        mailbox_name: row.try_get("mailbox_identifier")?,
        day,
        pattern_matched: row.try_get("pattern_matched")?,
        fail_pattern_matched: row.try_get("fail_pattern_matched")?,
        last_check_time,
        last_received_time,
        last_matched_subject: row.try_get("last_matched_subject")?,
        last_failed_subject: row.try_get("last_failed_subject")?,
    })
}

fn parse_utc(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(decode_error)
}

fn decode_error(e: chrono::ParseError) -> MonitorError {
    MonitorError::Persistence(sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    fn outcome(name: &str, matched: bool, hour: u32) -> DailyOutcome {
        DailyOutcome {
            mailbox_name: name.to_string(),
            day: day(),
            pattern_matched: matched,
            fail_pattern_matched: false,
            last_check_time: Utc.with_ymd_and_hms(2024, 5, 2, hour, 0, 0).unwrap(),
            last_received_time: None,
            last_matched_subject: matched.then(|| "Invoice #4821".to_string()),
            last_failed_subject: None,
        }
    }

    async fn count_rows(store: &SqliteStatusStore) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM mail_check_records")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get("n")
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut saved = outcome("Invoices", true, 7);
        saved.last_received_time = Some(Utc.with_ymd_and_hms(2024, 5, 2, 6, 15, 0).unwrap());
        store.upsert(&saved).await.unwrap();

        let loaded = store.get_for_day("Invoices", day()).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_missing_returns_none() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        assert!(store.get_for_day("Invoices", day()).await.unwrap().is_none());
        assert!(store.get_today("Invoices").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_timestamp_is_persistence_error() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO mail_check_records (mailbox_identifier, day, last_check_time)
             VALUES ('Invoices', '2024-05-02', 'yesterday-ish')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.get_for_day("Invoices", day()).await.unwrap_err();
        assert!(matches!(err, MonitorError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        store.upsert(&outcome("Invoices", true, 7)).await.unwrap();

        let loaded = store.get_for_day("INVOICES", day()).await.unwrap().unwrap();
        assert_eq!(loaded.mailbox_name, "Invoices");
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        store.upsert(&outcome("Invoices", false, 7)).await.unwrap();
        store.upsert(&outcome("Invoices", true, 8)).await.unwrap();

        assert_eq!(count_rows(&store).await, 1);
        let loaded = store.get_for_day("Invoices", day()).await.unwrap().unwrap();
        assert!(loaded.pattern_matched);
        assert_eq!(
            loaded.last_check_time,
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_days_are_separate_rows() {
        let store = SqliteStatusStore::in_memory().await.unwrap();
        let mut yesterday = outcome("Invoices", true, 7);
        yesterday.day = day().pred_opt().unwrap();
        store.upsert(&yesterday).await.unwrap();
        store.upsert(&outcome("Invoices", false, 7)).await.unwrap();

        assert_eq!(count_rows(&store).await, 2);
        let today = store.get_for_day("Invoices", day()).await.unwrap().unwrap();
        assert!(!today.pattern_matched);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_keep_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStatusStore::new(&dir.path().join("status.db"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..20u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert(&outcome("Invoices", i % 2 == 0, i % 24)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(count_rows(&store).await, 1);
        assert!(store.get_for_day("Invoices", day()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_new_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.db");
        let store = SqliteStatusStore::new(&path).await.unwrap();
        store.upsert(&outcome("Invoices", true, 7)).await.unwrap();
        store.close().await;
        assert!(path.exists());
    }
}
