//! Process runner.
//!
//! # Responsibilities
//! - Run startup hooks before any connection is accepted
//! - Serve HTTP until the shutdown future resolves
//! - Run shutdown hooks after the server has stopped accepting
//! - Honour a shutdown request that arrives while startup is still running
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, but what was opened is released
//! - Listeners accept last (traffic only when ready)

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::{ApiMount, HttpServer};
use crate::lifecycle::coordinator::LifecycleCoordinator;
use crate::lifecycle::error::{LifecycleError, ShutdownReport};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("startup failed: {0}")]
    Startup(#[from] LifecycleError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown was requested before the service became ready. Carries the
    /// outcome of the teardown that followed.
    #[error("shutdown requested during startup ({0})")]
    Interrupted(ShutdownReport),
}

/// A configured service ready to be run once.
pub struct Service {
    config: ServiceConfig,
    coordinator: Arc<LifecycleCoordinator>,
}

impl Service {
    pub fn new(config: ServiceConfig, coordinator: Arc<LifecycleCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<LifecycleCoordinator> {
        &self.coordinator
    }

    /// Start subsystems, bind the configured address, and serve until `shutdown`.
    pub async fn run<F>(self, api: ApiMount, shutdown: F) -> Result<ShutdownReport, ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = Box::pin(shutdown);
        self.start_unless(&mut shutdown).await?;

        let listener = match TcpListener::bind(self.config.service.bind_address()).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(
                    address = %self.config.service.bind_address(),
                    error = %e,
                    "Failed to bind listener"
                );
                self.coordinator.on_shutdown().await;
                return Err(e.into());
            }
        };

        self.serve(listener, api, shutdown).await
    }

    /// Like [`run`](Self::run) on an already-bound listener. Connections are
    /// not accepted until startup has completed.
    pub async fn run_on<F>(
        self,
        listener: TcpListener,
        api: ApiMount,
        shutdown: F,
    ) -> Result<ShutdownReport, ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = Box::pin(shutdown);
        self.start_unless(&mut shutdown).await?;
        self.serve(listener, api, shutdown).await
    }

    /// Run startup while watching `shutdown`. If it fires first, startup is
    /// interrupted and everything already opened is released.
    async fn start_unless<F>(&self, shutdown: &mut Pin<Box<F>>) -> Result<(), ServiceError>
    where
        F: Future<Output = ()>,
    {
        let start = self.start();
        tokio::pin!(start);

        tokio::select! {
            started = &mut start => started,
            _ = shutdown.as_mut() => {
                tracing::warn!("Shutdown requested during startup");
                let (_, report) = tokio::join!(start, self.coordinator.on_shutdown());
                Err(ServiceError::Interrupted(report))
            }
        }
    }

    async fn start(&self) -> Result<(), ServiceError> {
        tracing::info!(
            project = %self.config.service.project_name,
            version = %self.config.service.version,
            "Starting service"
        );

        if let Err(e) = self.coordinator.on_startup().await {
            if matches!(e, LifecycleError::Interrupted) {
                return Err(e.into());
            }
            tracing::error!(error = %e, "Startup failed, releasing initialized subsystems");
            let report = self.coordinator.on_shutdown().await;
            if !report.is_clean() {
                tracing::error!(error = %report, "Release after failed startup was incomplete");
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn serve<F>(
        self,
        listener: TcpListener,
        api: ApiMount,
        shutdown: F,
    ) -> Result<ShutdownReport, ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = HttpServer::new(&self.config, api, self.coordinator.subscribe());
        let served = server.run(listener, shutdown).await;
        if let Err(e) = &served {
            tracing::error!(error = %e, "HTTP server failed");
        }

        let report = self.coordinator.on_shutdown().await;
        served?;
        Ok(report)
    }
}
