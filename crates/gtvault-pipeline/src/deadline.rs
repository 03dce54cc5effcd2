//! Soft per-request deadline
//!
//! The deadline is cooperative: it is checked once, immediately before the
//! codec runs, and never interrupts work already in flight.

use std::time::{Duration, Instant};

use gtvault_core::{config::LimitsConfig, ErrorKind};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
    soft_limit: Duration,
}

impl Deadline {
    /// `abort_ratio` is clamped to [0, 1]; a non-finite ratio falls back to
    /// the full budget.
    pub fn new(started: Instant, budget: Duration, abort_ratio: f64) -> Self {
        let soft_limit =
            Duration::try_from_secs_f64(budget.as_secs_f64() * abort_ratio.clamp(0.0, 1.0))
                .unwrap_or(budget);
        Self {
            started,
            budget,
            soft_limit,
        }
    }

    pub fn from_limits(started: Instant, limits: &LimitsConfig) -> Self {
        Self::new(
            started,
            Duration::from_millis(limits.request_budget_ms),
            limits.abort_ratio,
        )
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn soft_limit(&self) -> Duration {
        self.soft_limit
    }

    /// Fail with `Timeout` once the soft limit has passed.
    pub fn check(&self) -> Result<(), PipelineError> {
        let elapsed = self.elapsed();
        if elapsed > self.soft_limit {
            return Err(PipelineError::new(
                ErrorKind::Timeout,
                "Request processing timeout",
            )
            .with_details(format!(
                "{} ms elapsed, abandoning at {} ms of a {} ms budget",
                elapsed.as_millis(),
                self.soft_limit.as_millis(),
                self.budget.as_millis()
            )));
        }
        Ok(())
    }
}
