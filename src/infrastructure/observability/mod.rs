//! Observability infrastructure - Metrics

mod cache_metrics;

pub use cache_metrics::{
    ReadOutcome, RebuildOutcome, record_decode_error, record_lock_contended, record_read,
    record_rebuild,
};
