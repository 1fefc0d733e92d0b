//! Utility helpers: data paths and calendar-day arithmetic.

use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Get the Mailwatch data directory (e.g. `~/.mailwatch/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".mailwatch")
}

/// Default database path (e.g. `~/.mailwatch/mailwatch.db`).
pub fn get_default_database_path() -> PathBuf {
    get_data_path().join("mailwatch.db")
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
        return home.join(rest);
    }
    if path == "~" {
        return dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    PathBuf::from(path)
}

/// Today's calendar day in the local timezone.
///
/// Daily outcomes are keyed by the day the check ran, not by message date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local midnight of `day`, expressed in UTC.
///
/// On a DST gap at midnight the earliest valid local instant is used.
pub fn day_start_utc(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&midnight),
    }
}

/// Format a day the way the store keys it (`YYYY-MM-DD`).
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
