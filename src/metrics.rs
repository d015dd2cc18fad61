//! Request and analysis counters for the metadata organ

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::AnalysisOutcome;

/// Shared metrics collector
#[derive(Default)]
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub total_latency_ms: AtomicU64,

    // Per-operation counters
    pub analyze_count: AtomicU64,
    pub export_count: AtomicU64,
    pub reverse_count: AtomicU64,
    pub map_count: AtomicU64,

    // Analysis outcomes
    pub analyzed_files: AtomicU64,
    pub unrecognized_files: AtomicU64,
    pub empty_files: AtomicU64,
    pub extraction_failures: AtomicU64,
    pub geolocated_files: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, op: &str, success: bool, latency_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        let counter = match op {
            "metadata.analyze" => &self.analyze_count,
            "metadata.export" => &self.export_count,
            "geo.reverse" => &self.reverse_count,
            "geo.map" => &self.map_count,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: &AnalysisOutcome) {
        let counter = match outcome {
            AnalysisOutcome::Analyzed(result) => {
                if result.coordinates().is_some() {
                    self.geolocated_files.fetch_add(1, Ordering::Relaxed);
                }
                &self.analyzed_files
            }
            AnalysisOutcome::NoMetadata => &self.empty_files,
            AnalysisOutcome::Unrecognized => &self.unrecognized_files,
            AnalysisOutcome::Failed(_) => &self.extraction_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            error_rate: if total > 0 { failed as f64 / total as f64 } else { 0.0 },
            avg_latency_ms: if total > 0 { total_latency / total } else { 0 },
            operations: OperationMetrics {
                analyze: self.analyze_count.load(Ordering::Relaxed),
                export: self.export_count.load(Ordering::Relaxed),
                reverse_geocode: self.reverse_count.load(Ordering::Relaxed),
                map: self.map_count.load(Ordering::Relaxed),
            },
            outcomes: OutcomeMetrics {
                analyzed: self.analyzed_files.load(Ordering::Relaxed),
                no_metadata: self.empty_files.load(Ordering::Relaxed),
                unrecognized: self.unrecognized_files.load(Ordering::Relaxed),
                failed: self.extraction_failures.load(Ordering::Relaxed),
                geolocated: self.geolocated_files.load(Ordering::Relaxed),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub error_rate: f64,
    pub avg_latency_ms: u64,
    pub operations: OperationMetrics,
    pub outcomes: OutcomeMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetrics {
    pub analyze: u64,
    pub export: u64,
    pub reverse_geocode: u64,
    pub map: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeMetrics {
    pub analyzed: u64,
    pub no_metadata: u64,
    pub unrecognized: u64,
    pub failed: u64,
    /// Analyzed files with both coordinates
    pub geolocated: u64,
}

/// Timer for tracking operation latency
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
