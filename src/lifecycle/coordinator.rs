//! Lifecycle coordinator.
//!
//! Sequences subsystem startup and shutdown around the server's serving
//! window. Steps within a hook list run strictly one after another; each is
//! bounded by a deadline so a hung dependency cannot stall start or stop.
//!
//! Startup and shutdown never overlap. A shutdown requested while startup is
//! still running interrupts the in-flight startup step, waits for startup to
//! stand down, and then releases whatever had already been opened.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};

use crate::config::LifecycleConfig;
use crate::health::{self, HealthStatus};
use crate::lifecycle::error::{LifecycleError, ShutdownReport};
use crate::lifecycle::hooks::{Hook, LifecycleHooks};
use crate::lifecycle::Phase;
use crate::observability::metrics::{self, StepOutcome};
use crate::subsystems::{Database, MessageBroker};

pub struct LifecycleCoordinator {
    hooks: LifecycleHooks,
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    phase: watch::Sender<Phase>,
    /// Held for the whole of a startup or shutdown sequence.
    sequence: Mutex<()>,
}

impl LifecycleCoordinator {
    pub fn new(hooks: LifecycleHooks, config: &LifecycleConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Uninitialized);
        Self {
            hooks,
            startup_timeout: config.startup_step_timeout(),
            shutdown_timeout: config.shutdown_step_timeout(),
            phase,
            sequence: Mutex::new(()),
        }
    }

    /// Coordinator for the database + broker pair.
    pub fn standard(
        database: Arc<dyn Database>,
        broker: Arc<dyn MessageBroker>,
        config: &LifecycleConfig,
    ) -> Self {
        Self::new(LifecycleHooks::standard(database, broker), config)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Observe phase changes.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Liveness payload; `None` outside `Ready`.
    pub fn health_check(&self) -> Option<HealthStatus> {
        health::liveness(self.phase())
    }

    /// Run every startup step in order and enter `Ready`.
    ///
    /// Only valid from `Uninitialized`. On failure the phase stays at
    /// `Starting`; call [`on_shutdown`](Self::on_shutdown) to release whatever
    /// was already initialized. A concurrent `on_shutdown` cancels the step in
    /// flight and makes this return [`LifecycleError::Interrupted`].
    pub async fn on_startup(&self) -> Result<(), LifecycleError> {
        let _sequence = self.sequence.lock().await;
        self.transition(Phase::Starting)?;

        for hook in self.hooks.startup_hooks() {
            let step = tokio::select! {
                biased;
                _ = self.shutdown_requested() => Err(LifecycleError::Interrupted),
                result = self.run_step(hook, self.startup_timeout) => result,
            };

            if let Err(e) = step {
                tracing::error!(
                    step = %hook.name(),
                    error = %e,
                    "Startup step failed, service will not become ready"
                );
                return Err(e);
            }
        }

        if self.transition(Phase::Ready).is_err() {
            tracing::warn!("Shutdown requested as startup finished, not entering ready");
            return Err(LifecycleError::Interrupted);
        }
        tracing::info!("Service ready");
        Ok(())
    }

    /// Run every shutdown step in order, attempting all of them.
    ///
    /// A no-op once shutdown has begun or finished. Called before startup it
    /// moves straight to `Stopped` without running any step.
    pub async fn on_shutdown(&self) -> ShutdownReport {
        let (previous, next) = self.advance(|current| match current {
            Phase::Uninitialized => Some(Phase::Stopped),
            Phase::Starting | Phase::Ready => Some(Phase::ShuttingDown),
            Phase::ShuttingDown | Phase::Stopped => None,
        });

        match next {
            None => {
                tracing::debug!(phase = %previous, "Shutdown already in progress or complete");
                return ShutdownReport::default();
            }
            Some(Phase::Stopped) => {
                tracing::info!("Shutdown before startup, nothing to release");
                return ShutdownReport::default();
            }
            Some(_) => {}
        }

        // An in-flight startup sees ShuttingDown and releases the sequence.
        let _sequence = self.sequence.lock().await;

        let mut report = ShutdownReport::default();
        for hook in self.hooks.shutdown_hooks() {
            if let Err(e) = self.run_step(hook, self.shutdown_timeout).await {
                tracing::error!(
                    step = %hook.name(),
                    error = %e,
                    "Shutdown step failed, continuing teardown"
                );
                report.push(e);
            }
        }

        if let Err(e) = self.transition(Phase::Stopped) {
            tracing::warn!(error = %e, "Could not mark service stopped");
        }

        if report.is_clean() {
            tracing::info!("Shutdown complete");
        } else {
            tracing::warn!(
                failed_steps = ?report.failed_steps(),
                "Shutdown completed with errors"
            );
        }
        report
    }

    /// Resolve once shutdown has begun.
    async fn shutdown_requested(&self) {
        let mut phases = self.phase.subscribe();
        let _ = phases
            .wait_for(|p| matches!(p, Phase::ShuttingDown | Phase::Stopped))
            .await;
    }

    fn transition(&self, to: Phase) -> Result<(), LifecycleError> {
        let (from, next) = self.advance(|current| current.can_transition_to(to).then_some(to));
        match next {
            Some(_) => Ok(()),
            None => Err(LifecycleError::InvalidTransition { from, to }),
        }
    }

    /// Atomically apply `decide` to the current phase. Returns the phase seen
    /// and the phase entered, if any.
    fn advance<F>(&self, decide: F) -> (Phase, Option<Phase>)
    where
        F: FnOnce(Phase) -> Option<Phase>,
    {
        let mut previous = Phase::Uninitialized;
        let mut entered = None;
        self.phase.send_if_modified(|current| {
            previous = *current;
            entered = decide(*current);
            match entered {
                Some(next) => {
                    *current = next;
                    true
                }
                None => false,
            }
        });

        if let Some(next) = entered {
            tracing::info!(from = %previous, to = %next, "Lifecycle phase changed");
            metrics::record_phase(next);
        }
        (previous, entered)
    }

    async fn run_step(&self, hook: &Hook, deadline: Duration) -> Result<(), LifecycleError> {
        let started = Instant::now();
        tracing::info!(step = %hook.name(), "Running lifecycle step");

        match tokio::time::timeout(deadline, hook.invoke()).await {
            Ok(Ok(())) => {
                metrics::record_step(hook.name(), StepOutcome::Ok, started);
                tracing::info!(
                    step = %hook.name(),
                    elapsed = ?started.elapsed(),
                    "Lifecycle step complete"
                );
                Ok(())
            }
            Ok(Err(source)) => {
                metrics::record_step(hook.name(), StepOutcome::Error, started);
                Err(LifecycleError::StepFailed {
                    step: hook.name().to_string(),
                    source,
                })
            }
            Err(_) => {
                metrics::record_step(hook.name(), StepOutcome::Timeout, started);
                Err(LifecycleError::StepTimedOut {
                    step: hook.name().to_string(),
                    timeout: deadline,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::SubsystemError;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<&'static str>>>;

    type Step = futures_util::future::Ready<Result<(), SubsystemError>>;

    fn recording(journal: &Journal, entry: &'static str) -> impl Fn() -> Step + Send + Sync + 'static {
        let journal = journal.clone();
        move || {
            journal.lock().unwrap().push(entry);
            futures_util::future::ready(Ok(()))
        }
    }

    fn config(timeout_secs: u64) -> LifecycleConfig {
        LifecycleConfig {
            startup_step_timeout_secs: timeout_secs,
            shutdown_step_timeout_secs: timeout_secs,
        }
    }

    #[tokio::test]
    async fn full_cycle_walks_every_phase() {
        let journal: Journal = Arc::default();
        let hooks = LifecycleHooks::new()
            .on_startup("a", recording(&journal, "start-a"))
            .on_startup("b", recording(&journal, "start-b"))
            .on_shutdown("b", recording(&journal, "stop-b"))
            .on_shutdown("a", recording(&journal, "stop-a"));
        let coordinator = LifecycleCoordinator::new(hooks, &config(5));
        let mut phases = coordinator.subscribe();

        assert_eq!(coordinator.phase(), Phase::Uninitialized);
        assert!(coordinator.health_check().is_none());

        coordinator.on_startup().await.unwrap();
        assert_eq!(coordinator.phase(), Phase::Ready);
        assert!(phases.has_changed().unwrap());
        assert_eq!(*phases.borrow_and_update(), Phase::Ready);
        assert_eq!(coordinator.health_check(), Some(HealthStatus::ok()));

        let report = coordinator.on_shutdown().await;
        assert!(report.is_clean());
        assert_eq!(coordinator.phase(), Phase::Stopped);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["start-a", "start-b", "stop-b", "stop-a"]
        );
    }

    #[tokio::test]
    async fn startup_runs_once() {
        let coordinator = LifecycleCoordinator::new(LifecycleHooks::new(), &config(5));
        coordinator.on_startup().await.unwrap();

        let err = coordinator.on_startup().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition { from: Phase::Ready, to: Phase::Starting }
        ));
    }

    #[tokio::test]
    async fn shutdown_before_startup_skips_hooks() {
        let journal: Journal = Arc::default();
        let hooks = LifecycleHooks::new().on_shutdown("a", recording(&journal, "stop-a"));
        let coordinator = LifecycleCoordinator::new(hooks, &config(5));

        assert!(coordinator.on_shutdown().await.is_clean());
        assert_eq!(coordinator.phase(), Phase::Stopped);
        assert!(journal.lock().unwrap().is_empty());
        assert!(coordinator.on_startup().await.is_err());
    }

    #[tokio::test]
    async fn hung_startup_step_times_out() {
        let hooks = LifecycleHooks::new().on_startup("hang", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        let coordinator = LifecycleCoordinator::new(hooks, &config(1));

        let err = coordinator.on_startup().await.unwrap_err();
        assert!(matches!(err, LifecycleError::StepTimedOut { ref step, .. } if step == "hang"));
        assert_eq!(coordinator.phase(), Phase::Starting);
    }

    #[tokio::test]
    async fn shutdown_mid_startup_cancels_the_step_before_teardown() {
        let journal: Journal = Arc::default();
        let slow = {
            let journal = journal.clone();
            move || {
                let journal = journal.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    journal.lock().unwrap().push("slow-done");
                    Ok(())
                }
            }
        };
        let hooks = LifecycleHooks::new()
            .on_startup("slow", slow)
            .on_startup("next", recording(&journal, "start-next"))
            .on_shutdown("stop", recording(&journal, "stop"));
        let coordinator = LifecycleCoordinator::new(hooks, &config(5));

        let (started, report) = tokio::join!(coordinator.on_startup(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            coordinator.on_shutdown().await
        });

        assert!(matches!(started, Err(LifecycleError::Interrupted)));
        assert!(report.is_clean());
        assert_eq!(coordinator.phase(), Phase::Stopped);
        assert!(coordinator.health_check().is_none());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*journal.lock().unwrap(), vec!["stop"]);
    }

    #[tokio::test]
    async fn shutdown_failures_are_collected() {
        let journal: Journal = Arc::default();
        let hooks = LifecycleHooks::new()
            .on_shutdown("first", || async { Err(SubsystemError::close("first", "refused")) })
            .on_shutdown("second", recording(&journal, "stop-second"));
        let coordinator = LifecycleCoordinator::new(hooks, &config(5));
        coordinator.on_startup().await.unwrap();

        let report = coordinator.on_shutdown().await;
        assert_eq!(report.failed_steps(), vec!["first"]);
        assert_eq!(*journal.lock().unwrap(), vec!["stop-second"]);
        assert_eq!(coordinator.phase(), Phase::Stopped);
        assert!(report.into_result().is_err());
    }
}
