//! Mailwatch Monitor: the watchdog engine.
//!
//! This crate contains:
//! - **pattern**: Success/failure rule evaluation on fetched messages
//! - **monitor**: The per-mailbox polling loop with once-per-day dedup
//! - **orchestrator**: Runs every monitor concurrently under one shutdown token
//! - **query**: Read-only status lookups for the CLI

pub mod monitor;
pub mod orchestrator;
pub mod pattern;
pub mod query;

#[cfg(test)]
mod testing;

pub use monitor::{CycleOutcome, LastCheck, MailboxMonitor, MonitorState, MonitorStatus};
pub use orchestrator::{Orchestrator, SourceFactory};
pub use pattern::{PatternSet, PatternVerdict};
pub use query::StatusQuery;
