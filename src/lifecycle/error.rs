//! Lifecycle error types.

use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::Phase;
use crate::subsystems::SubsystemError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("lifecycle step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: SubsystemError,
    },

    #[error("lifecycle step '{step}' timed out after {timeout:?}")]
    StepTimedOut { step: String, timeout: Duration },

    #[error("startup interrupted by a shutdown request")]
    Interrupted,
}

impl LifecycleError {
    /// Name of the step that failed, if the error came from a step.
    pub fn step(&self) -> Option<&str> {
        match self {
            LifecycleError::InvalidTransition { .. } | LifecycleError::Interrupted => None,
            LifecycleError::StepFailed { step, .. } | LifecycleError::StepTimedOut { step, .. } => {
                Some(step)
            }
        }
    }
}

/// Teardown failures collected across all shutdown steps.
#[derive(Debug, Default, Error)]
#[error("{} shutdown step(s) failed", .failures.len())]
pub struct ShutdownReport {
    failures: Vec<LifecycleError>,
}

impl ShutdownReport {
    pub(crate) fn push(&mut self, failure: LifecycleError) {
        self.failures.push(failure);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[LifecycleError] {
        &self.failures
    }

    /// Names of the steps that failed, in the order they ran.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.failures.iter().filter_map(LifecycleError::step).collect()
    }

    pub fn into_result(self) -> Result<(), ShutdownReport> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
