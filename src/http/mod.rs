//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → cors.rs (preflight, response headers)
//!     → request.rs (assign / propagate request ID)
//!     → server.rs (tracing span, timeout, routing)
//!         → handlers.rs (/health, {prefix}/openapi.json)
//!         → api.rs mount under {prefix} (inventory.rs in the binary)
//! ```

pub mod api;
pub mod cors;
pub mod handlers;
pub mod inventory;
pub mod request;
pub mod server;

pub use api::ApiMount;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
