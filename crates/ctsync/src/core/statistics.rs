use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Result of processing one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Created,
    Updated,
    /// Up to date, or creation/update cancelled by a caller hook.
    Unchanged,
    Failed(String),
}

/// Counters for one sync run.
///
/// Counters only grow. They are atomic so concurrent batch workers never
/// lose an update.
#[derive(Debug)]
pub struct SyncStatistics {
    processed: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    failed: AtomicU64,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Point-in-time copy of [`SyncStatistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
}

impl Default for SyncStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStatistics {
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            created: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn increment_processed(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    /// Folds one outcome into the counters. Does not touch `processed`.
    pub fn record(&self, outcome: &BatchOutcome) {
        match outcome {
            BatchOutcome::Created => self.increment_created(),
            BatchOutcome::Updated => self.increment_updated(),
            BatchOutcome::Unchanged => {}
            BatchOutcome::Failed(_) => self.increment_failed(1),
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Processed drafts that were neither created, updated nor failed.
    pub fn unchanged(&self) -> u64 {
        let snapshot = self.snapshot();
        snapshot
            .processed
            .saturating_sub(snapshot.created + snapshot.updated + snapshot.failed)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn processing_time(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            processed: self.processed(),
            created: self.created(),
            updated: self.updated(),
            failed: self.failed(),
        }
    }

    pub fn report_message(&self) -> String {
        self.snapshot().to_string()
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Summary: {} processed ({} created, {} updated, {} failed to sync).",
            self.processed, self.created, self.updated, self.failed
        )
    }
}

impl fmt::Display for SyncStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}
