//! Delivery counters shared by all listeners.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::hooks::FeedKind;

/// Process-wide delivery counters.
///
/// Shared through an `Arc` and injected into every dispatcher.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    almanax_jobs: AtomicU64,
    rss_jobs: AtomicU64,
    twitter_jobs: AtomicU64,
    delivered: AtomicU64,
    deregistered: AtomicU64,
    anomalous: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub almanax_jobs: u64,
    pub rss_jobs: u64,
    pub twitter_jobs: u64,
    pub delivered: u64,
    pub deregistered: u64,
    pub anomalous: u64,
}

impl StatsSnapshot {
    /// Jobs emitted across all feed kinds.
    pub fn total_jobs(&self) -> u64 {
        self.almanax_jobs + self.rss_jobs + self.twitter_jobs
    }
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count send jobs emitted by a feed of `kind`.
    pub fn record_jobs(&self, kind: FeedKind, count: usize) {
        let counter = match kind {
            FeedKind::Almanax => &self.almanax_jobs,
            FeedKind::Rss => &self.rss_jobs,
            FeedKind::Twitter => &self.twitter_jobs,
        };
        counter.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deregistered(&self, count: u64) {
        self.deregistered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_anomalous(&self) {
        self.anomalous.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            almanax_jobs: self.almanax_jobs.load(Ordering::Relaxed),
            rss_jobs: self.rss_jobs.load(Ordering::Relaxed),
            twitter_jobs: self.twitter_jobs.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            deregistered: self.deregistered.load(Ordering::Relaxed),
            anomalous: self.anomalous.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = DeliveryStats::new();
        stats.record_jobs(FeedKind::Almanax, 2);
        stats.record_jobs(FeedKind::Twitter, 1);
        stats.record_delivered();
        stats.record_deregistered(3);
        stats.record_anomalous();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.almanax_jobs, 2);
        assert_eq!(snapshot.rss_jobs, 0);
        assert_eq!(snapshot.total_jobs(), 3);
        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.deregistered, 3);
        assert_eq!(snapshot.anomalous, 1);
    }
}
