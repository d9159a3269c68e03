//! Cache-aside metrics
//!
//! Counters go through the `metrics` facade and are no-ops until the host
//! process installs a recorder.

use metrics::counter;

use crate::domain::cache::ReadStrategy;

/// How a single read was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Served from a live cache entry
    Hit,
    /// Served from a negative cache entry
    NegativeHit,
    /// Loaded from the backing store and cached
    Loaded,
    /// Backing store confirmed absence; negative entry written
    Absent,
    /// Logically expired entry served while a rebuild runs
    Stale,
    /// No entry under the logical-expiry strategy
    NotCached,
    /// Mutex strategy gave up waiting for the rebuild lock
    Contended,
}

impl ReadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadOutcome::Hit => "hit",
            ReadOutcome::NegativeHit => "negative_hit",
            ReadOutcome::Loaded => "loaded",
            ReadOutcome::Absent => "absent",
            ReadOutcome::Stale => "stale",
            ReadOutcome::NotCached => "not_cached",
            ReadOutcome::Contended => "contended",
        }
    }
}

/// Result of a background rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Refreshed,
    Failed,
    Panicked,
    Rejected,
}

impl RebuildOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RebuildOutcome::Refreshed => "refreshed",
            RebuildOutcome::Failed => "failed",
            RebuildOutcome::Panicked => "panicked",
            RebuildOutcome::Rejected => "rejected",
        }
    }
}

pub fn record_read(strategy: ReadStrategy, outcome: ReadOutcome) {
    counter!(
        "cache_aside_reads_total",
        "strategy" => strategy.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_lock_contended(strategy: ReadStrategy) {
    counter!("cache_aside_lock_contended_total", "strategy" => strategy.as_str()).increment(1);
}

pub fn record_decode_error(strategy: ReadStrategy) {
    counter!("cache_aside_decode_errors_total", "strategy" => strategy.as_str()).increment(1);
}

pub fn record_rebuild(outcome: RebuildOutcome) {
    counter!("cache_aside_rebuilds_total", "outcome" => outcome.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels_are_distinct() {
        let labels = [
            ReadOutcome::Hit,
            ReadOutcome::NegativeHit,
            ReadOutcome::Loaded,
            ReadOutcome::Absent,
            ReadOutcome::Stale,
            ReadOutcome::NotCached,
            ReadOutcome::Contended,
        ]
        .map(|o| o.as_str());

        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_read(ReadStrategy::Mutex, ReadOutcome::Hit);
        record_lock_contended(ReadStrategy::Mutex);
        record_decode_error(ReadStrategy::PassThrough);
        record_rebuild(RebuildOutcome::Refreshed);
    }
}
