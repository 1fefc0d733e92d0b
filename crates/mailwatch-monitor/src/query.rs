//! Status queries: read-only view over today's outcomes.

use std::sync::Arc;

use tracing::debug;

use mailwatch_core::config::{Config, EffectiveConfig};
use mailwatch_core::error::{MonitorError, Result};
use mailwatch_core::store::StatusStore;
use mailwatch_core::types::{DailyOutcome, MailboxStatus, MailboxSummary, StatusReport};

pub struct StatusQuery {
    mailboxes: Vec<EffectiveConfig>,
    store: Arc<dyn StatusStore>,
}

impl StatusQuery {
    pub fn new(config: &Config, store: Arc<dyn StatusStore>) -> Self {
        Self {
            mailboxes: config.effective_mailboxes(),
            store,
        }
    }

    /// Today's status for `mailbox_name` (case-insensitive).
    ///
    /// A mailbox that is not configured and one that has not been checked
    /// yet today both yield [`MailboxStatus::NotCheckedYet`].
    pub async fn get_status(&self, mailbox_name: &str) -> Result<MailboxStatus> {
        match self.store.get_today(mailbox_name).await? {
            Some(outcome) => {
                debug!(
                    mailbox = mailbox_name,
                    pattern_matched = outcome.pattern_matched,
                    fail_pattern_matched = outcome.fail_pattern_matched,
                    "status retrieved"
                );
                Ok(MailboxStatus::Checked(outcome))
            }
            None => {
                debug!(mailbox = mailbox_name, "no record today");
                Ok(MailboxStatus::NotCheckedYet)
            }
        }
    }

    /// Today's outcome, or [`MonitorError::NotFound`].
    pub async fn get_outcome(&self, mailbox_name: &str) -> Result<DailyOutcome> {
        match self.get_status(mailbox_name).await? {
            MailboxStatus::Checked(outcome) => Ok(outcome),
            MailboxStatus::NotCheckedYet => Err(MonitorError::NotFound(mailbox_name.to_string())),
        }
    }

    /// Flattened status for `mailbox_name`.
    pub async fn get_report(&self, mailbox_name: &str) -> Result<StatusReport> {
        Ok(StatusReport::from(&self.get_status(mailbox_name).await?))
    }

    /// Configured mailbox names, in configuration order.
    pub fn mailbox_names(&self) -> Vec<String> {
        self.mailboxes.iter().map(|m| m.name.clone()).collect()
    }

    /// Status of every configured mailbox plus what it is configured to
    /// look for.
    pub async fn list_all_statuses(&self) -> Result<Vec<MailboxSummary>> {
        let mut summaries = Vec::with_capacity(self.mailboxes.len());
        for mailbox in &self.mailboxes {
            let status = self.get_status(&mailbox.name).await?;
            summaries.push(MailboxSummary {
                name: mailbox.name.clone(),
                report: StatusReport::from(&status),
                has_pattern_configuration: mailbox.has_success_pattern(),
                has_fail_pattern_configuration: mailbox.has_fail_pattern(),
                has_sender_configuration: mailbox.has_sender_filter(),
                expected_senders: mailbox.expected_sender_emails.clone(),
            });
        }
        debug!(count = summaries.len(), "statuses retrieved");
        Ok(summaries)
    }
}
