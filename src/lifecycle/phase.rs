//! Process lifecycle phases.
//!
//! # State Transitions
//! ```text
//! Uninitialized → Starting → Ready → ShuttingDown → Stopped
//!                    │                    ▲
//!                    └────────────────────┘  (startup failed, release what was opened)
//! Uninitialized → Stopped                    (shutdown before startup, nothing to release)
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Starting,
    Ready,
    ShuttingDown,
    Stopped,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Starting => "starting",
            Phase::Ready => "ready",
            Phase::ShuttingDown => "shutting_down",
            Phase::Stopped => "stopped",
        }
    }

    /// Position in the lifecycle, used as the phase gauge value.
    pub fn index(self) -> u8 {
        match self {
            Phase::Uninitialized => 0,
            Phase::Starting => 1,
            Phase::Ready => 2,
            Phase::ShuttingDown => 3,
            Phase::Stopped => 4,
        }
    }

    /// Whether `self → next` is a permitted transition.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Uninitialized, Phase::Starting)
                | (Phase::Starting, Phase::Ready)
                | (Phase::Starting, Phase::ShuttingDown)
                | (Phase::Ready, Phase::ShuttingDown)
                | (Phase::ShuttingDown, Phase::Stopped)
                | (Phase::Uninitialized, Phase::Stopped)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
