//! Inventory service library.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod subsystems;

pub use config::ServiceConfig;
pub use http::{ApiMount, HttpServer};
pub use lifecycle::{LifecycleCoordinator, Phase, Service, Shutdown};
