//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle coordinator, HTTP layer, broker consumers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (phase gauge, step counters and histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, plain or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the HTTP layer
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
