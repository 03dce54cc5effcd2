use std::sync::Arc;
use std::time::Instant;

use gtvault_core::config::{Environment, GtvaultConfig, LimitsConfig};
use gtvault_crypto::EnvelopeCodec;

use crate::deadline::Deadline;
use crate::metrics::PipelineMetrics;

/// Shared, read-only handler state. Cloned per request.
#[derive(Clone)]
pub struct PipelineState {
    inner: Arc<Inner>,
}

struct Inner {
    codec: EnvelopeCodec,
    limits: LimitsConfig,
    environment: Environment,
    file_base: String,
    file_extension: String,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineState {
    pub fn new(codec: EnvelopeCodec, config: &GtvaultConfig, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                codec,
                limits: config.limits.clone(),
                environment: config.server.environment,
                file_base: config.transfer.file_base.clone(),
                file_extension: config.transfer.file_extension.clone(),
                metrics,
            }),
        }
    }

    pub fn codec(&self) -> &EnvelopeCodec {
        &self.inner.codec
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.inner.limits
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    pub fn file_base(&self) -> &str {
        &self.inner.file_base
    }

    pub fn file_extension(&self) -> &str {
        &self.inner.file_extension
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.inner.metrics
    }

    pub fn deadline(&self, started: Instant) -> Deadline {
        Deadline::from_limits(started, &self.inner.limits)
    }
}
