//! Ordered registry of named async lifecycle hooks.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::subsystems::{Database, MessageBroker, SubsystemError};

type HookFn = dyn Fn() -> BoxFuture<'static, Result<(), SubsystemError>> + Send + Sync;

/// A single named lifecycle step.
pub struct Hook {
    name: String,
    run: Box<HookFn>,
}

impl Hook {
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SubsystemError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move || run().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self) -> BoxFuture<'static, Result<(), SubsystemError>> {
        (self.run)()
    }
}

/// Startup and shutdown hooks, each run in registration order.
#[derive(Default)]
pub struct LifecycleHooks {
    startup: Vec<Hook>,
    shutdown: Vec<Hook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a startup step.
    pub fn on_startup<F, Fut>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SubsystemError>> + Send + 'static,
    {
        self.startup.push(Hook::new(name, run));
        self
    }

    /// Append a shutdown step.
    pub fn on_shutdown<F, Fut>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SubsystemError>> + Send + 'static,
    {
        self.shutdown.push(Hook::new(name, run));
        self
    }

    /// Database first, then broker consumers; teardown in reverse.
    pub fn standard(database: Arc<dyn Database>, broker: Arc<dyn MessageBroker>) -> Self {
        let db_init = database.clone();
        let broker_start = broker.clone();
        let broker_close = broker;
        let db_close = database;

        Self::new()
            .on_startup("database.initialize", move || {
                let db = db_init.clone();
                async move { db.initialize().await }
            })
            .on_startup("broker.start_consumers", move || {
                let broker = broker_start.clone();
                async move { broker.start_consumers().await }
            })
            .on_shutdown("broker.close", move || {
                let broker = broker_close.clone();
                async move { broker.close().await }
            })
            .on_shutdown("database.close", move || {
                let db = db_close.clone();
                async move { db.close().await }
            })
    }

    pub fn startup_hooks(&self) -> &[Hook] {
        &self.startup
    }

    pub fn shutdown_hooks(&self) -> &[Hook] {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hooks_keep_registration_order() {
        let hooks = LifecycleHooks::new()
            .on_startup("first", || async { Ok(()) })
            .on_startup("second", || async { Ok(()) })
            .on_shutdown("last", || async {
                Err(SubsystemError::close("test", "boom"))
            });

        let names: Vec<_> = hooks.startup_hooks().iter().map(Hook::name).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(hooks.shutdown_hooks().len(), 1);
        assert!(hooks.shutdown_hooks()[0].invoke().await.is_err());
    }
}
