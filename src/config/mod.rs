//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (PROJECT_NAME, API_PREFIX, PORT, ...)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, read-only)
//! ```
//!
//! # Design Decisions
//! - Config is read once at construction time; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, validate_config_or_err, ConfigError};
pub use schema::{
    BrokerConfig, ConsumerConfig, CorsConfig, DatabaseConfig, LifecycleConfig,
    ObservabilityConfig, ServiceConfig,
};
