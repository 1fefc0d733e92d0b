//! Domain types: daily outcomes, poll verdicts, and the shapes handed to
//! the query boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Message returned to callers when no record exists for today.
pub const NOT_CHECKED_MESSAGE: &str = "Mailbox not found or not yet checked today";

// ─────────────────────────────────────────────
// Persisted outcome
// ─────────────────────────────────────────────

/// The one persisted verdict per mailbox per calendar day.
///
/// `day` is the local date the check ran on, not the date of any message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOutcome {
    pub mailbox_name: String,
    pub day: NaiveDate,
    pub pattern_matched: bool,
    pub fail_pattern_matched: bool,
    pub last_check_time: DateTime<Utc>,
    pub last_received_time: Option<DateTime<Utc>>,
    pub last_matched_subject: Option<String>,
    pub last_failed_subject: Option<String>,
}

// ─────────────────────────────────────────────
// Cycle verdict
// ─────────────────────────────────────────────

/// Result of one completed poll cycle, before it is persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckVerdict {
    pub pattern_matched: bool,
    pub fail_pattern_matched: bool,
    pub matched_subject: Option<String>,
    pub failed_subject: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
}

impl CheckVerdict {
    /// A cycle that found nothing worth reporting.
    pub fn not_matched() -> Self {
        Self::default()
    }

    /// Stamp the verdict with its mailbox, day and check time.
    pub fn into_outcome(
        self,
        mailbox_name: impl Into<String>,
        day: NaiveDate,
        checked_at: DateTime<Utc>,
    ) -> DailyOutcome {
        DailyOutcome {
            mailbox_name: mailbox_name.into(),
            day,
            pattern_matched: self.pattern_matched,
            fail_pattern_matched: self.fail_pattern_matched,
            last_check_time: checked_at,
            last_received_time: self.received_at,
            last_matched_subject: self.matched_subject,
            last_failed_subject: self.failed_subject,
        }
    }
}

// ─────────────────────────────────────────────
// Query shapes
// ─────────────────────────────────────────────

/// Status of one mailbox for today.
///
/// An unknown mailbox and one that has not been checked yet are the same
/// thing from the caller's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailboxStatus {
    Checked(DailyOutcome),
    NotCheckedYet,
}

impl MailboxStatus {
    pub fn outcome(&self) -> Option<&DailyOutcome> {
        match self {
            Self::Checked(outcome) => Some(outcome),
            Self::NotCheckedYet => None,
        }
    }

    pub fn is_pattern_matched(&self) -> bool {
        self.outcome().is_some_and(|o| o.pattern_matched)
    }

    pub fn is_fail_pattern_matched(&self) -> bool {
        self.outcome().is_some_and(|o| o.fail_pattern_matched)
    }
}

/// Flattened, serializable status for one mailbox.
///
/// "Not checked yet" carries `error`; "checked but not matched" carries
/// `patternMatched: false` and no error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub pattern_matched: bool,
    pub fail_pattern_matched: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_received_date: Option<DateTime<Utc>>,
    pub last_matched_subject: Option<String>,
    pub last_failed_subject: Option<String>,
    pub error: Option<String>,
}

impl From<&MailboxStatus> for StatusReport {
    fn from(status: &MailboxStatus) -> Self {
        match status {
            MailboxStatus::Checked(o) => Self {
                pattern_matched: o.pattern_matched,
                fail_pattern_matched: o.fail_pattern_matched,
                last_checked: Some(o.last_check_time),
                last_received_date: o.last_received_time,
                last_matched_subject: o.last_matched_subject.clone(),
                last_failed_subject: o.last_failed_subject.clone(),
                error: None,
            },
            MailboxStatus::NotCheckedYet => Self {
                error: Some(NOT_CHECKED_MESSAGE.to_string()),
                ..Self::default()
            },
        }
    }
}

/// Dashboard row: a mailbox's status plus what it is configured to look for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxSummary {
    pub name: String,
    #[serde(flatten)]
    pub report: StatusReport,
    pub has_pattern_configuration: bool,
    pub has_fail_pattern_configuration: bool,
    pub has_sender_configuration: bool,
    pub expected_senders: Vec<String>,
}
