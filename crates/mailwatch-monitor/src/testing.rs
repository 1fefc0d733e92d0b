//! Scripted mail source and in-memory store for monitor tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use mailwatch_core::error::{MonitorError, Result};
use mailwatch_core::source::{FetchedMessage, MailSession, MailSource, MessageRef};
use mailwatch_core::store::StatusStore;
use mailwatch_core::types::DailyOutcome;

#[derive(Default)]
pub(crate) struct Script {
    pub messages: Vec<(MessageRef, FetchedMessage)>,
    pub fail_connect: bool,
    pub stall_fetch: bool,
    pub connects: usize,
    pub closes: usize,
    pub fetched: Vec<String>,
    pub last_senders: Vec<String>,
}

/// A mail source that serves a fixed list of messages.
#[derive(Clone, Default)]
pub(crate) struct FakeSource {
    pub script: Arc<Mutex<Script>>,
}

impl FakeSource {
    pub fn with_messages(messages: Vec<FetchedMessage>) -> Self {
        let source = Self::default();
        source.script.lock().unwrap().messages = messages
            .into_iter()
            .enumerate()
            .map(|(i, m)| (MessageRef::new((i + 1).to_string()), m))
            .collect();
        source
    }

    /// Serves `messages` but never completes a fetch.
    pub fn stalled(messages: Vec<FetchedMessage>) -> Self {
        let source = Self::with_messages(messages);
        source.script.lock().unwrap().stall_fetch = true;
        source
    }

    pub fn failing() -> Self {
        let source = Self::default();
        source.script.lock().unwrap().fail_connect = true;
        source
    }

    pub fn connects(&self) -> usize {
        self.script.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.script.lock().unwrap().closes
    }

    pub fn fetched(&self) -> Vec<String> {
        self.script.lock().unwrap().fetched.clone()
    }

    pub fn last_senders(&self) -> Vec<String> {
        self.script.lock().unwrap().last_senders.clone()
    }
}

#[async_trait]
impl MailSource for FakeSource {
    fn protocol(&self) -> &str {
        "FAKE"
    }

    async fn connect(&self, _host: &str, _port: u16, _use_tls: bool) -> Result<Box<dyn MailSession>> {
        let mut script = self.script.lock().unwrap();
        script.connects += 1;
        if script.fail_connect {
            return Err(MonitorError::Connection("connection refused".into()));
        }
        Ok(Box::new(FakeSession {
            script: Arc::clone(&self.script),
        }))
    }
}

struct FakeSession {
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl MailSession for FakeSession {
    async fn authenticate(&mut self, _username: &str, _password: &str) -> Result<()> {
        Ok(())
    }

    async fn list_since(&mut self, _since: DateTime<Utc>, senders: &[String]) -> Result<Vec<MessageRef>> {
        let mut script = self.script.lock().unwrap();
        script.last_senders = senders.to_vec();
        Ok(script.messages.iter().map(|(r, _)| r.clone()).collect())
    }

    async fn fetch(&mut self, message: &MessageRef) -> Result<FetchedMessage> {
        let stall = {
            let mut script = self.script.lock().unwrap();
            script.fetched.push(message.id.clone());
            script.stall_fetch
        };
        if stall {
            std::future::pending::<()>().await;
        }

        let script = self.script.lock().unwrap();
        script
            .messages
            .iter()
            .find(|(r, _)| r == message)
            .map(|(_, m)| m.clone())
            .ok_or_else(|| MonitorError::Protocol(format!("no message {}", message.id)))
    }

    async fn close(&mut self) -> Result<()> {
        self.script.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Status store kept in a map, keyed by lowercased name and day.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub records: Mutex<HashMap<(String, NaiveDate), DailyOutcome>>,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn get_for_day(&self, mailbox_name: &str, day: NaiveDate) -> Result<Option<DailyOutcome>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&(mailbox_name.to_lowercase(), day)).cloned())
    }

    async fn upsert(&self, outcome: &DailyOutcome) -> Result<()> {
        if self.fail_writes {
            return Err(MonitorError::Persistence(sqlx::Error::PoolTimedOut));
        }
        self.records.lock().unwrap().insert(
            (outcome.mailbox_name.to_lowercase(), outcome.day),
            outcome.clone(),
        );
        Ok(())
    }
}

/// A plain-text message received at `hour`:00 UTC.
pub(crate) fn message(subject: &str, body: &str, hour: u32) -> FetchedMessage {
    FetchedMessage {
        subject: subject.into(),
        text_body: Some(body.into()),
        html_body: None,
        received_at: Utc.with_ymd_and_hms(2024, 5, 2, hour, 0, 0).unwrap(),
        from_address: "billing@example.com".into(),
    }
}
