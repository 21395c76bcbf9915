//! External subsystems the service depends on.
//!
//! # Data Flow
//! ```text
//! LifecycleCoordinator
//!     → database.rs (Database: initialize / close)
//!     → broker.rs   (MessageBroker: start_consumers / close)
//!         → redis_streams.rs (consumer group tasks)
//!         → MessageHandler (per delivered entry)
//! ```
//!
//! # Design Decisions
//! - Subsystems are held as `Arc<dyn Trait>` and injected, never global
//! - Each subsystem owns its resources exclusively; the coordinator only triggers
//! - `close` is idempotent on every implementation

pub mod broker;
pub mod database;
pub mod redis_streams;

use thiserror::Error;

pub use broker::{BrokerMessage, LoggingHandler, MessageBroker, MessageHandler};
pub use database::{Database, PostgresDatabase};
pub use redis_streams::RedisStreamsBroker;

/// Error raised by a subsystem collaborator.
#[derive(Debug, Error)]
pub enum SubsystemError {
    #[error("{subsystem}: connection failed: {message}")]
    Connect { subsystem: String, message: String },

    #[error("{subsystem}: close failed: {message}")]
    Close { subsystem: String, message: String },

    #[error("{subsystem}: consumer error: {message}")]
    Consumer { subsystem: String, message: String },
}

impl SubsystemError {
    pub fn connect(subsystem: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Connect {
            subsystem: subsystem.into(),
            message: err.to_string(),
        }
    }

    pub fn close(subsystem: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Close {
            subsystem: subsystem.into(),
            message: err.to_string(),
        }
    }

    pub fn consumer(subsystem: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Consumer {
            subsystem: subsystem.into(),
            message: err.to_string(),
        }
    }
}
