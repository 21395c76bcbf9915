//! Metrics collection and exposition.
//!
//! # Metrics
//! - `inventory_lifecycle_phase` (gauge): current phase index (0=uninitialized .. 4=stopped)
//! - `inventory_lifecycle_step_total` (counter): steps run, by step and outcome
//! - `inventory_lifecycle_step_duration_seconds` (histogram): step latency
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests need no setup
//! - Outcome label is one of `ok`, `error`, `timeout`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::Phase;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// How a lifecycle step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Ok,
    Error,
    Timeout,
}

impl StepOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            StepOutcome::Ok => "ok",
            StepOutcome::Error => "error",
            StepOutcome::Timeout => "timeout",
        }
    }
}

pub fn record_phase(phase: Phase) {
    gauge!("inventory_lifecycle_phase").set(phase.index() as f64);
}

pub fn record_step(step: &str, outcome: StepOutcome, started: Instant) {
    let labels = [
        ("step", step.to_string()),
        ("outcome", outcome.as_str().to_string()),
    ];
    counter!("inventory_lifecycle_step_total", &labels).increment(1);
    histogram!("inventory_lifecycle_step_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
}
