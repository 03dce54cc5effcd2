//! Prometheus request metrics
//!
//! Exposed series:
//!   gtvault_requests_total{operation, outcome}
//!   gtvault_request_duration_seconds{operation}

use std::time::Duration;

use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{exponential_buckets, Histogram},
    },
    registry::Registry,
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub operation: Operation,
    /// `ok` or the wire name of the error kind
    pub outcome: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OperationLabels {
    pub operation: Operation,
}

fn latency_histogram() -> Histogram {
    // 0.5 ms .. ~4 s
    Histogram::new(exponential_buckets(0.0005, 2.0, 14))
}

pub struct PipelineMetrics {
    requests: Family<RequestLabels, Counter>,
    duration: Family<OperationLabels, Histogram, fn() -> Histogram>,
}

impl PipelineMetrics {
    /// Create the metric families and register them.
    pub fn register(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "gtvault_requests",
            "Encrypt/decrypt requests by outcome",
            metrics.requests.clone(),
        );
        registry.register(
            "gtvault_request_duration_seconds",
            "Encrypt/decrypt request latency",
            metrics.duration.clone(),
        );
        metrics
    }

    pub fn observe(&self, operation: Operation, outcome: &str, elapsed: Duration) {
        self.requests
            .get_or_create(&RequestLabels {
                operation,
                outcome: outcome.to_string(),
            })
            .inc();
        self.duration
            .get_or_create(&OperationLabels { operation })
            .observe(elapsed.as_secs_f64());
    }

    pub fn request_count(&self, operation: Operation, outcome: &str) -> u64 {
        self.requests
            .get_or_create(&RequestLabels {
                operation,
                outcome: outcome.to_string(),
            })
            .get()
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            requests: Family::default(),
            duration: Family::new_with_constructor(latency_histogram as fn() -> Histogram),
        }
    }
}
