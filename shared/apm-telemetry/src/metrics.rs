//! Dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Simple counter metric
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
    name: String,
}

impl Counter {
    pub fn new(name: &str) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.to_string(),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What happened to each call made on a dispatcher
#[derive(Debug, Clone)]
pub struct DispatchStats {
    /// Handed to a live sink
    pub forwarded: Counter,
    /// Skipped because telemetry is disabled
    pub suppressed: Counter,
    /// Lost because telemetry is enabled but no sink is running
    pub dropped: Counter,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self {
            forwarded: Counter::new("telemetry_forwarded"),
            suppressed: Counter::new("telemetry_suppressed"),
            dropped: Counter::new("telemetry_dropped"),
        }
    }
}
