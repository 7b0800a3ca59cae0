//! Process-wide enrichment counters.
//!
//! Failures are swallowed at the trigger boundary, so these counters are
//! the only place they surface besides the logs.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::warning::EnrichmentWarning;

#[derive(Debug, Default)]
pub struct EnrichmentStats {
    events_received: AtomicU64,
    deletions_skipped: AtomicU64,
    records_written: AtomicU64,
    sink_failures: AtomicU64,
    link_misses: AtomicU64,
    product_misses: AtomicU64,
    lookup_failures: AtomicU64,
    missing_short_ids: AtomicU64,
    malformed_events: AtomicU64,
}

/// A point-in-time copy of [`EnrichmentStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStatsSnapshot {
    pub events_received: u64,
    pub deletions_skipped: u64,
    pub records_written: u64,
    pub sink_failures: u64,
    pub link_misses: u64,
    pub product_misses: u64,
    pub lookup_failures: u64,
    pub missing_short_ids: u64,
    pub malformed_events: u64,
}

impl EnrichmentStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deletion_skipped(&self) {
        self.deletions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn observe(&self, warning: &EnrichmentWarning) {
        let counter = match warning {
            EnrichmentWarning::MalformedEvent { .. } => &self.malformed_events,
            EnrichmentWarning::MissingShortId => &self.missing_short_ids,
            EnrichmentWarning::LinkNotFound { .. } => &self.link_misses,
            EnrichmentWarning::ProductNotFound { .. } => &self.product_misses,
            EnrichmentWarning::LinkLookupFailed { .. }
            | EnrichmentWarning::ProductLookupFailed { .. } => &self.lookup_failures,
            EnrichmentWarning::SinkWriteFailed { .. } => &self.sink_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> EnrichmentStatsSnapshot {
        EnrichmentStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            deletions_skipped: self.deletions_skipped.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            link_misses: self.link_misses.load(Ordering::Relaxed),
            product_misses: self.product_misses.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            missing_short_ids: self.missing_short_ids.load(Ordering::Relaxed),
            malformed_events: self.malformed_events.load(Ordering::Relaxed),
        }
    }
}
