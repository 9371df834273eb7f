pub mod analyzer;
pub mod logger;
pub mod records;

pub use logger::{CsvSink, EventSink, LineSink, MemorySink, TracingSink};
pub use records::LogRecord;

use crate::time::SimTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: f64,
    pub publish_events: u64,
    pub empty_fires: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub links_formed: u64,
    pub candidates_seen: u64,
    pub resamples: u64,
    pub position_samples: u64,
    /// Tasks added after the run started.
    pub tasks_enqueued: u64,
    pub queued_tasks: usize,
    pub match_rate: f64,
}

/// Run counters. Cheap to clone, all clones share state.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    publish_events: u64,
    empty_fires: u64,
    matched: u64,
    unmatched: u64,
    links_formed: u64,
    candidates_seen: u64,
    resamples: u64,
    positions_logged: u64,
    tasks_enqueued: u64,
    snapshots: Vec<MetricsSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
        }
    }

    pub fn publish_fired(&self) {
        self.inner.write().publish_events += 1;
    }

    pub fn empty_fire(&self) {
        self.inner.write().empty_fires += 1;
    }

    pub fn task_matched(&self, links: usize) {
        let mut inner = self.inner.write();
        inner.matched += 1;
        inner.links_formed += links as u64;
    }

    pub fn task_unmatched(&self) {
        self.inner.write().unmatched += 1;
    }

    pub fn candidates_seen(&self, n: usize) {
        self.inner.write().candidates_seen += n as u64;
    }

    pub fn resampled(&self) {
        self.inner.write().resamples += 1;
    }

    pub fn task_enqueued(&self) {
        self.inner.write().tasks_enqueued += 1;
    }

    pub fn positions_logged(&self, n: usize) {
        self.inner.write().positions_logged += n as u64;
    }

    pub fn position_samples(&self) -> u64 {
        self.inner.read().positions_logged
    }

    pub fn matched(&self) -> u64 {
        self.inner.read().matched
    }

    pub fn unmatched(&self) -> u64 {
        self.inner.read().unmatched
    }

    pub fn snapshot(&self, now: SimTime, queued_tasks: usize) -> MetricsSnapshot {
        let inner = self.inner.read();
        let attempts = inner.matched + inner.unmatched;
        let match_rate = if attempts > 0 {
            inner.matched as f64 / attempts as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            timestamp: now.as_secs_f64(),
            publish_events: inner.publish_events,
            empty_fires: inner.empty_fires,
            matched: inner.matched,
            unmatched: inner.unmatched,
            links_formed: inner.links_formed,
            candidates_seen: inner.candidates_seen,
            resamples: inner.resamples,
            position_samples: inner.positions_logged,
            tasks_enqueued: inner.tasks_enqueued,
            queued_tasks,
            match_rate,
        }
    }

    pub fn save_snapshot(&self, now: SimTime, queued_tasks: usize) -> MetricsSnapshot {
        let snapshot = self.snapshot(now, queued_tasks);
        self.inner.write().snapshots.push(snapshot.clone());
        snapshot
    }

    pub fn get_snapshots(&self) -> Vec<MetricsSnapshot> {
        self.inner.read().snapshots.clone()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_rate_counts_attempts_only() {
        let metrics = MetricsCollector::new();
        metrics.publish_fired();
        metrics.empty_fire();
        metrics.task_matched(3);
        metrics.task_unmatched();
        metrics.task_unmatched();
        metrics.task_unmatched();

        let snap = metrics.snapshot(SimTime::from_secs(5), 2);
        assert_eq!(snap.match_rate, 0.25);
        assert_eq!(snap.links_formed, 3);
        assert_eq!(snap.timestamp, 5.0);
    }

    #[test]
    fn snapshot_carries_mobility_and_candidate_counters() {
        let metrics = MetricsCollector::new();
        metrics.candidates_seen(4);
        metrics.candidates_seen(2);
        metrics.resampled();
        metrics.positions_logged(12);
        metrics.task_enqueued();

        let snap = metrics.snapshot(SimTime::ZERO, 0);
        assert_eq!(snap.candidates_seen, 6);
        assert_eq!(snap.resamples, 1);
        assert_eq!(snap.position_samples, 12);
        assert_eq!(snap.tasks_enqueued, 1);
    }

    #[test]
    fn clones_share_counters() {
        let a = MetricsCollector::new();
        let b = a.clone();
        b.task_matched(1);
        assert_eq!(a.matched(), 1);
    }
}
