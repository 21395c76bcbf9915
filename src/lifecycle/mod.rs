//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (coordinator.rs):
//!     Uninitialized → Starting
//!     → database.initialize → broker.start_consumers
//!     → Ready → listener accepts (startup.rs)
//!
//! Shutdown (coordinator.rs):
//!     Signal received (signals.rs) → server stops accepting, drains
//!     → ShuttingDown → broker.close → database.close → Stopped
//! ```
//!
//! # Design Decisions
//! - Ordered startup: each step completes before the next begins
//! - Ordered shutdown: reverse of startup, every step attempted
//! - Every step has a deadline

pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod phase;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use coordinator::LifecycleCoordinator;
pub use error::{LifecycleError, ShutdownReport};
pub use hooks::{Hook, LifecycleHooks};
pub use phase::Phase;
pub use shutdown::Shutdown;
pub use startup::{Service, ServiceError};
