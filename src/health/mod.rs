//! Liveness reporting.
//!
//! The probe is deliberately dependency-free: it reflects only that the
//! process reached `Ready`, never database or broker reachability.

use serde::Serialize;

use crate::lifecycle::Phase;

/// Service identifier reported by the liveness probe.
pub const SERVICE_NAME: &str = "inventory-service";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            service: SERVICE_NAME,
        }
    }
}

/// Liveness for the given phase: `Some` only while `Ready`.
pub fn liveness(phase: Phase) -> Option<HealthStatus> {
    (phase == Phase::Ready).then(HealthStatus::ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_reports_literal_payload() {
        let status = liveness(Phase::Ready).unwrap();
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({"status": "ok", "service": "inventory-service"})
        );
    }

    #[test]
    fn other_phases_report_nothing() {
        for phase in [
            Phase::Uninitialized,
            Phase::Starting,
            Phase::ShuttingDown,
            Phase::Stopped,
        ] {
            assert!(liveness(phase).is_none(), "{}", phase);
        }
    }
}
