//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Broker consumer read fails:
//!     → backoff.rs (exponential delay with jitter)
//!     → reconnect and resume reading
//! ```
//!
//! # Design Decisions
//! - Every lifecycle step has a deadline (enforced by the coordinator)
//! - Consumer reconnects back off exponentially, capped, with jitter

pub mod backoff;

pub use backoff::Backoff;
