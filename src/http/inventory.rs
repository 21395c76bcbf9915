//! Inventory API surface bundled with the binary.
//!
//! Stock bookkeeping lives behind the broker and database subsystems; this
//! router only reports where the service is in its lifecycle.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::watch;

use crate::health::SERVICE_NAME;
use crate::http::api::ApiMount;
use crate::lifecycle::Phase;

#[derive(Debug, Serialize)]
pub struct InventoryStatus {
    pub service: &'static str,
    pub phase: Phase,
}

async fn status(State(phase): State<watch::Receiver<Phase>>) -> Json<InventoryStatus> {
    Json(InventoryStatus {
        service: SERVICE_NAME,
        phase: *phase.borrow(),
    })
}

pub fn router(phase: watch::Receiver<Phase>) -> ApiMount {
    let router = Router::new()
        .route("/inventory/status", get(status))
        .with_state(phase);

    ApiMount::new(router).advertise("/inventory/status")
}
