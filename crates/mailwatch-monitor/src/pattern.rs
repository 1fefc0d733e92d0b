//! Pattern resolver: success and failure rules for a fetched message.
//!
//! Success: every configured dimension (subject, body) must match; with
//! nothing configured any message counts.
//! Failure: nothing configured never fails; one dimension configured
//! decides alone; both configured must both match.

use regex::{Regex, RegexBuilder};
use tracing::trace;

use mailwatch_core::config::EffectiveConfig;
use mailwatch_core::error::{MonitorError, Result};
use mailwatch_core::source::FetchedMessage;

/// Result of evaluating one message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternVerdict {
    pub success_match: bool,
    pub fail_match: bool,
}

/// Compiled, case-insensitive patterns of one mailbox.
#[derive(Clone, Debug, Default)]
pub struct PatternSet {
    success_subject: Option<Regex>,
    success_body: Option<Regex>,
    fail_subject: Option<Regex>,
    fail_body: Option<Regex>,
}

impl PatternSet {
    /// Compile the four pattern fields. Empty strings count as unset.
    pub fn compile(config: &EffectiveConfig) -> Result<Self> {
        let build = |field: &'static str, pattern: &Option<String>| -> Result<Option<Regex>> {
            match pattern.as_deref().filter(|p| !p.is_empty()) {
                None => Ok(None),
                Some(p) => RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map(Some)
                    .map_err(|source| MonitorError::InvalidPattern {
                        mailbox: config.name.clone(),
                        field,
                        source,
                    }),
            }
        };

        Ok(Self {
            success_subject: build("expectedSubjectPattern", &config.expected_subject_pattern)?,
            success_body: build("expectedBodyPattern", &config.expected_body_pattern)?,
            fail_subject: build("failSubjectPattern", &config.fail_subject_pattern)?,
            fail_body: build("failBodyPattern", &config.fail_body_pattern)?,
        })
    }

    pub fn has_success_pattern(&self) -> bool {
        self.success_subject.is_some() || self.success_body.is_some()
    }

    pub fn has_fail_pattern(&self) -> bool {
        self.fail_subject.is_some() || self.fail_body.is_some()
    }

    /// Whether `message` satisfies the success rule.
    pub fn is_success(&self, message: &FetchedMessage) -> bool {
        let subject_ok = self
            .success_subject
            .as_ref()
            .map_or(true, |re| re.is_match(&message.subject));
        let body_ok = self
            .success_body
            .as_ref()
            .map_or(true, |re| re.is_match(message.body()));

        trace!(subject = %message.subject, subject_ok, body_ok, "success pattern check");
        subject_ok && body_ok
    }

    /// Whether `message` satisfies the failure rule.
    pub fn is_failure(&self, message: &FetchedMessage) -> bool {
        let subject_hit = self
            .fail_subject
            .as_ref()
            .map(|re| re.is_match(&message.subject));
        let body_hit = self
            .fail_body
            .as_ref()
            .map(|re| re.is_match(message.body()));

        let result = match (subject_hit, body_hit) {
            (None, None) => false,
            (Some(s), None) => s,
            (None, Some(b)) => b,
            (Some(s), Some(b)) => s && b,
        };
        trace!(subject = %message.subject, ?subject_hit, ?body_hit, result, "fail pattern check");
        result
    }

    pub fn evaluate(&self, message: &FetchedMessage) -> PatternVerdict {
        PatternVerdict {
            success_match: self.is_success(message),
            fail_match: self.is_failure(message),
        }
    }
}
