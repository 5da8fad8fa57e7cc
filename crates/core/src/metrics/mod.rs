//! Metrics for pipeline runs
//!
//! Counters and histograms follow the `geoparse_*` naming convention and are
//! labelled by module name so independent recognizers/resolvers stay apart.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all geoparse metrics
pub const METRICS_PREFIX: &str = "geoparse";

/// Register all metric descriptions
pub fn register_metrics() {
    // Corpus writes
    describe_counter!(
        format!("{}_references_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total references created by recognizers"
    );

    describe_counter!(
        format!("{}_referents_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total referents created by resolvers"
    );

    // Idempotency
    describe_counter!(
        format!("{}_units_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Documents or references skipped because they were already processed"
    );

    // Capability calls
    describe_histogram!(
        format!("{}_capability_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Capability predict/fit latency in seconds"
    );

    describe_counter!(
        format!("{}_capability_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total failed capability calls"
    );

    tracing::info!("Metrics registered");
}

/// Helper to time one capability call
pub struct CapabilityTimer {
    start: Instant,
    module: String,
    operation: &'static str,
}

impl CapabilityTimer {
    /// Start timing a call on the named module
    pub fn start(module: &str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            module: module.to_string(),
            operation,
        }
    }

    /// Record call completion
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed().as_secs_f64();

        histogram!(
            format!("{}_capability_duration_seconds", METRICS_PREFIX),
            "module" => self.module.clone(),
            "operation" => self.operation
        )
        .record(duration);

        if !success {
            counter!(
                format!("{}_capability_errors_total", METRICS_PREFIX),
                "module" => self.module,
                "operation" => self.operation
            )
            .increment(1);
        }
    }
}

/// Record references written for one document
pub fn record_references(module: &str, count: usize) {
    counter!(
        format!("{}_references_created_total", METRICS_PREFIX),
        "module" => module.to_string()
    )
    .increment(count as u64);
}

/// Record referents written
pub fn record_referents(module: &str, count: usize) {
    counter!(
        format!("{}_referents_created_total", METRICS_PREFIX),
        "module" => module.to_string()
    )
    .increment(count as u64);
}

/// Record units skipped as already processed
pub fn record_skipped(module: &str, unit: &'static str, count: usize) {
    counter!(
        format!("{}_units_skipped_total", METRICS_PREFIX),
        "module" => module.to_string(),
        "unit" => unit
    )
    .increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_timer() {
        let timer = CapabilityTimer::start("ManualRecognizer", "predict");
        std::thread::sleep(std::time::Duration::from_millis(5));
        timer.finish(false);
        // Just verify it runs without a recorder installed
    }
}
