//! Status store: one [`DailyOutcome`] per mailbox per calendar day.
//!
//! Writers go through [`StatusStore::upsert`], which must keep the
//! `(mailbox, day)` key unique under concurrent access. Lookups compare
//! mailbox names case-insensitively.

mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::DailyOutcome;

pub use sqlite::SqliteStatusStore;

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// The outcome recorded for `mailbox_name` on `day`, if any.
    async fn get_for_day(&self, mailbox_name: &str, day: NaiveDate)
        -> Result<Option<DailyOutcome>>;

    /// Insert or replace the outcome for `(outcome.mailbox_name, outcome.day)`.
    async fn upsert(&self, outcome: &DailyOutcome) -> Result<()>;

    /// The outcome recorded for `mailbox_name` today (local date).
    async fn get_today(&self, mailbox_name: &str) -> Result<Option<DailyOutcome>> {
        self.get_for_day(mailbox_name, crate::utils::today()).await
    }
}
