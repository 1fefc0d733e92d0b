//! Mailbox monitor: the per-mailbox polling loop.
//!
//! Each cycle:
//! 1. reads today's outcome and skips the check if it already matched
//! 2. lists today's candidates (filtered by sender) from the mail source
//! 3. picks the matched message (first success match in server order, or
//!    the newest candidate when no success pattern is configured)
//! 4. evaluates the failure rule on that message
//! 5. upserts today's outcome
//!
//! A failed cycle is logged and retried after the normal interval. Only
//! the shutdown token ends the loop.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mailwatch_core::config::EffectiveConfig;
use mailwatch_core::error::Result;
use mailwatch_core::source::{FetchedMessage, MailSession, MailSource};
use mailwatch_core::store::StatusStore;
use mailwatch_core::types::{CheckVerdict, DailyOutcome};
use mailwatch_core::utils::{day_start_utc, today};

use crate::pattern::PatternSet;

// ─────────────────────────────────────────────
// State
// ─────────────────────────────────────────────

/// Where a monitor is in its loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitorState {
    #[default]
    Idle,
    Checking,
    Sleeping,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// How the most recent cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LastCheck {
    MatchedToday,
    NotMatched,
    Error,
}

impl fmt::Display for LastCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MatchedToday => "matched today",
            Self::NotMatched => "not matched",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Observable status of one monitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// `None` until the first cycle ends.
    pub last_check: Option<LastCheck>,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_check {
            Some(last) => write!(f, "{} ({last})", self.state),
            None => write!(f, "{}", self.state),
        }
    }
}

/// What a completed cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Today's outcome already matched; the mail source was not contacted.
    Skipped,
    /// The mailbox was checked and today's outcome written.
    Checked(DailyOutcome),
}

// ─────────────────────────────────────────────
// MailboxMonitor
// ─────────────────────────────────────────────

pub struct MailboxMonitor {
    config: EffectiveConfig,
    patterns: PatternSet,
    source: Arc<dyn MailSource>,
    store: Arc<dyn StatusStore>,
    status: Arc<RwLock<MonitorStatus>>,
}

impl MailboxMonitor {
    /// Create a monitor, compiling the mailbox's patterns.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidPattern`](mailwatch_core::MonitorError::InvalidPattern)
    /// if a configured pattern does not compile.
    pub fn new(
        config: EffectiveConfig,
        source: Arc<dyn MailSource>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self> {
        let patterns = PatternSet::compile(&config)?;
        Ok(Self {
            config,
            patterns,
            source,
            store,
            status: Arc::new(RwLock::new(MonitorStatus::default())),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Shared handle to the monitor's current status.
    pub fn status_handle(&self) -> Arc<RwLock<MonitorStatus>> {
        Arc::clone(&self.status)
    }

    pub async fn status(&self) -> MonitorStatus {
        *self.status.read().await
    }

    async fn set_state(&self, state: MonitorState) {
        self.status.write().await.state = state;
    }

    /// Run cycles until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let name = self.config.name.clone();
        info!(
            mailbox = %name,
            protocol = %self.config.protocol,
            interval_s = self.config.polling_frequency_seconds,
            "monitor started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.set_state(MonitorState::Checking).await;
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.run_cycle() => result,
            };

            let last = match result {
                Ok(CycleOutcome::Skipped) => LastCheck::MatchedToday,
                Ok(CycleOutcome::Checked(outcome)) if outcome.pattern_matched => {
                    LastCheck::MatchedToday
                }
                Ok(CycleOutcome::Checked(_)) => LastCheck::NotMatched,
                Err(e) if e.is_retryable() => {
                    warn!(mailbox = %name, error = %e, "check failed, will retry after interval");
                    LastCheck::Error
                }
                Err(e) => {
                    error!(mailbox = %name, error = %e, "check failed, will retry after interval");
                    LastCheck::Error
                }
            };
            *self.status.write().await = MonitorStatus {
                state: MonitorState::Sleeping,
                last_check: Some(last),
            };
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }

        self.set_state(MonitorState::Stopped).await;
        info!(mailbox = %name, "monitor stopped");
    }

    /// Run one cycle: skip guard, check, persist.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let day = today();

        if let Some(existing) = self.store.get_for_day(&self.config.name, day).await? {
            if existing.pattern_matched {
                debug!(mailbox = %self.config.name, "already matched today, skipping check");
                return Ok(CycleOutcome::Skipped);
            }
        }

        let verdict = self.check_mailbox(day_start_utc(day)).await?;
        let outcome = verdict.into_outcome(self.config.name.clone(), day, Utc::now());
        self.store.upsert(&outcome).await?;

        if outcome.fail_pattern_matched {
            warn!(
                mailbox = %outcome.mailbox_name,
                subject = outcome.last_failed_subject.as_deref().unwrap_or(""),
                "failure pattern detected"
            );
        }
        info!(
            mailbox = %outcome.mailbox_name,
            pattern_matched = outcome.pattern_matched,
            fail_pattern_matched = outcome.fail_pattern_matched,
            "check completed"
        );

        Ok(CycleOutcome::Checked(outcome))
    }

    /// Open a session, scan today's candidates, and close the session.
    async fn check_mailbox(&self, since: chrono::DateTime<Utc>) -> Result<CheckVerdict> {
        let cfg = &self.config;
        debug!(
            mailbox = %cfg.name,
            protocol = self.source.protocol(),
            host = %cfg.host,
            port = cfg.port,
            "connecting"
        );

        let mut session = self.source.connect(&cfg.host, cfg.port, cfg.use_ssl).await?;
        let result = self.scan(session.as_mut(), since).await;

        if let Err(e) = session.close().await {
            debug!(mailbox = %cfg.name, error = %e, "close failed");
        }
        result
    }

    async fn scan(
        &self,
        session: &mut dyn MailSession,
        since: chrono::DateTime<Utc>,
    ) -> Result<CheckVerdict> {
        let cfg = &self.config;
        session.authenticate(&cfg.username, &cfg.password).await?;

        let candidates = session
            .list_since(since, &cfg.expected_sender_emails)
            .await?;
        debug!(mailbox = %cfg.name, count = candidates.len(), "candidates found");

        let Some(newest) = candidates.last() else {
            debug!(mailbox = %cfg.name, "no messages today");
            return Ok(CheckVerdict::not_matched());
        };

        if !self.patterns.has_success_pattern() {
            let message = session.fetch(newest).await?;
            return Ok(self.matched(message));
        }

        let mut last_received = None;
        for candidate in &candidates {
            let message = session.fetch(candidate).await?;
            if self.patterns.is_success(&message) {
                return Ok(self.matched(message));
            }
            last_received = Some(message.received_at);
        }

        info!(mailbox = %cfg.name, "no message matched the success pattern");
        Ok(CheckVerdict {
            received_at: last_received,
            ..CheckVerdict::not_matched()
        })
    }

    /// Verdict for the message established as today's match.
    fn matched(&self, message: FetchedMessage) -> CheckVerdict {
        let failed = self.patterns.is_failure(&message);
        debug!(mailbox = %self.config.name, subject = %message.subject, failed, "matched message");
        CheckVerdict {
            pattern_matched: true,
            fail_pattern_matched: failed,
            failed_subject: failed.then(|| message.subject.clone()),
            matched_subject: Some(message.subject),
            received_at: Some(message.received_at),
        }
    }
}
