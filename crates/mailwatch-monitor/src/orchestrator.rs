//! Orchestrator: runs one monitor per configured mailbox.
//!
//! Responsibilities:
//! - Validate the configuration and build every monitor up front
//! - Spawn each monitor as its own `tokio` task
//! - Propagate shutdown through a shared `CancellationToken`
//! - Report per-mailbox monitor state

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mailwatch_core::config::{Config, EffectiveConfig};
use mailwatch_core::error::Result;
use mailwatch_core::source::MailSource;
use mailwatch_core::store::StatusStore;

use crate::monitor::{MailboxMonitor, MonitorStatus};

/// Builds the mail source for a mailbox.
pub type SourceFactory = Arc<dyn Fn(&EffectiveConfig) -> Arc<dyn MailSource> + Send + Sync>;

pub struct Orchestrator {
    /// Monitors not yet started.
    pending: Vec<MailboxMonitor>,
    /// Status handles, in configuration order.
    statuses: Vec<(String, Arc<RwLock<MonitorStatus>>)>,
    /// Cancelled by `stop()`; a child of the token passed to `start()`.
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Build monitors for every mailbox using the protocol adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config, store: Arc<dyn StatusStore>) -> Result<Self> {
        Self::with_source_factory(config, store, Arc::new(mailwatch_mail::connect_source))
    }

    /// Build monitors with a custom mail source factory.
    pub fn with_source_factory(
        config: &Config,
        store: Arc<dyn StatusStore>,
        sources: SourceFactory,
    ) -> Result<Self> {
        config.validate()?;

        let mut pending = Vec::new();
        let mut statuses = Vec::new();
        for effective in config.effective_mailboxes() {
            let source = sources(&effective);
            let monitor = MailboxMonitor::new(effective, source, Arc::clone(&store))?;
            statuses.push((monitor.name().to_string(), monitor.status_handle()));
            pending.push(monitor);
        }

        Ok(Self {
            pending,
            statuses,
            shutdown: CancellationToken::new(),
        })
    }

    /// Names of the managed mailboxes, in configuration order.
    pub fn mailbox_names(&self) -> Vec<String> {
        self.statuses.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Number of managed mailboxes.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Whether there are no managed mailboxes.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Spawn every monitor.
    ///
    /// The returned handle completes once every monitor loop has ended,
    /// which happens only after `token` is cancelled or `stop()` is called.
    /// A `stop()` issued before `start()` still applies.
    pub fn start(&mut self, token: CancellationToken) -> JoinHandle<()> {
        let stopped = self.shutdown.is_cancelled();
        self.shutdown = token.child_token();
        if stopped {
            self.shutdown.cancel();
        }
        let monitors = std::mem::take(&mut self.pending);

        if monitors.is_empty() {
            warn!("no mailboxes to monitor");
        } else {
            info!(mailboxes = ?self.mailbox_names(), "starting {} monitor(s)", monitors.len());
        }

        let mut set = JoinSet::new();
        for monitor in monitors {
            set.spawn(monitor.run(self.shutdown.clone()));
        }

        tokio::spawn(async move {
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "monitor task panicked");
                }
            }
            info!("all monitors stopped");
        })
    }

    /// Signal every monitor to stop.
    pub fn stop(&self) {
        info!("stopping monitors");
        self.shutdown.cancel();
    }

    /// Current status of every monitor, in configuration order.
    pub async fn statuses(&self) -> Vec<(String, MonitorStatus)> {
        let mut out = Vec::with_capacity(self.statuses.len());
        for (name, status) in &self.statuses {
            out.push((name.clone(), *status.read().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use mailwatch_core::config::MailboxConfig;
    use mailwatch_core::error::MonitorError;

    use crate::monitor::{LastCheck, MonitorState};
    use crate::testing::{message, FakeSource, MemoryStore};

    fn config(names: &[&str]) -> Config {
        Config {
            mailboxes: names.iter().map(|n| MailboxConfig::named(*n)).collect(),
            ..Config::default()
        }
    }

    /// One fake source per mailbox name.
    fn factory(sources: HashMap<String, FakeSource>) -> SourceFactory {
        Arc::new(move |cfg: &EffectiveConfig| -> Arc<dyn MailSource> {
            Arc::new(sources.get(&cfg.name).cloned().unwrap_or_default())
        })
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Orchestrator::new(
            &config(&["Invoices", "invoices"]),
            Arc::new(MemoryStore::default()),
        );
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_mailbox_names_keep_order() {
        let orchestrator =
            Orchestrator::new(&config(&["b", "a"]), Arc::new(MemoryStore::default())).unwrap();
        assert_eq!(orchestrator.mailbox_names(), vec!["b", "a"]);
        assert_eq!(orchestrator.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_config_completes_immediately() {
        let mut orchestrator =
            Orchestrator::new(&Config::default(), Arc::new(MemoryStore::default())).unwrap();
        assert!(orchestrator.is_empty());
        orchestrator.start(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_mailbox_does_not_block_others() {
        let healthy = FakeSource::with_messages(vec![message("Report", "", 6)]);
        let broken = FakeSource::failing();
        let sources = HashMap::from([
            ("Healthy".to_string(), healthy.clone()),
            ("Broken".to_string(), broken.clone()),
        ]);

        let store = Arc::new(MemoryStore::default());
        let mut orchestrator = Orchestrator::with_source_factory(
            &config(&["Broken", "Healthy"]),
            store.clone(),
            factory(sources),
        )
        .unwrap();

        let token = CancellationToken::new();
        let handle = orchestrator.start(token.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(healthy.connects(), 1);
        assert_eq!(broken.connects(), 1);
        assert_eq!(store.len(), 1);

        let statuses: HashMap<_, _> = orchestrator.statuses().await.into_iter().collect();
        assert_eq!(statuses["Broken"].state, MonitorState::Sleeping);
        assert_eq!(statuses["Broken"].last_check, Some(LastCheck::Error));
        assert_eq!(statuses["Healthy"].last_check, Some(LastCheck::MatchedToday));

        token.cancel();
        handle.await.unwrap();

        for (_, status) in orchestrator.statuses().await {
            assert_eq!(status.state, MonitorState::Stopped);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_all_monitors() {
        let mut orchestrator = Orchestrator::with_source_factory(
            &config(&["a", "b", "c"]),
            Arc::new(MemoryStore::default()),
            factory(HashMap::new()),
        )
        .unwrap();

        let handle = orchestrator.start(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(5)).await;
        orchestrator.stop();
        handle.await.unwrap();

        assert!(orchestrator
            .statuses()
            .await
            .iter()
            .all(|(_, s)| s.state == MonitorState::Stopped));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_honoured() {
        let source = FakeSource::with_messages(vec![message("Report", "", 6)]);
        let sources = HashMap::from([("a".to_string(), source.clone())]);
        let mut orchestrator = Orchestrator::with_source_factory(
            &config(&["a"]),
            Arc::new(MemoryStore::default()),
            factory(sources),
        )
        .unwrap();

        orchestrator.stop();
        orchestrator.start(CancellationToken::new()).await.unwrap();

        assert_eq!(source.connects(), 0);
        assert_eq!(orchestrator.statuses().await[0].1.state, MonitorState::Stopped);
    }
}
