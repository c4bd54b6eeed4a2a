//! Dispatch counters
//!
//! In-process counters for monitoring how much traffic flows through the
//! dispatch core and how often receivers misbehave.
//!
//! ## Usage
//!
//! ```ignore
//! let snapshot = messenger.hub().metrics().snapshot();
//! println!("{} global dispatches, {} failures", snapshot.global_dispatches, snapshot.receiver_failures);
//! ```

use crate::domain::DispatchReport;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the registry hub and the local dispatcher.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Registry dispatches that ran, empty registries included. Broadcasts
    /// for a capability that never had a registry are not counted.
    pub global_dispatches: AtomicU64,
    /// Entity-scoped and find-and-broadcast calls. Token invocations are not
    /// counted.
    pub local_dispatches: AtomicU64,
    /// Successful handler invocations over all paths
    pub deliveries: AtomicU64,
    /// Isolated receiver failures during registry dispatch
    pub receiver_failures: AtomicU64,
    /// Destroyed receivers pruned from registries
    pub pruned: AtomicU64,
    /// World scans performed by find-and-broadcast
    pub scans: AtomicU64,
    /// Rejected re-entrant registry dispatches
    pub reentrancy_rejections: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_global(&self, report: &DispatchReport) {
        self.global_dispatches.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.receiver_failures
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.pruned.fetch_add(report.pruned as u64, Ordering::Relaxed);
    }

    pub fn record_local(&self, delivered: usize) {
        self.local_dispatches.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reentrancy_rejection(&self) {
        self.reentrancy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            global_dispatches: self.global_dispatches.load(Ordering::Relaxed),
            local_dispatches: self.local_dispatches.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            receiver_failures: self.receiver_failures.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            reentrancy_rejections: self.reentrancy_rejections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub global_dispatches: u64,
    pub local_dispatches: u64,
    pub deliveries: u64,
    pub receiver_failures: u64,
    pub pruned: u64,
    pub scans: u64,
    pub reentrancy_rejections: u64,
}
