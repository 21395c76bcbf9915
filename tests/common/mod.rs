//! Fake subsystems shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use inventory_service::config::{LifecycleConfig, ServiceConfig};
use inventory_service::subsystems::{Database, MessageBroker, SubsystemError};

/// Ordered record of subsystem calls, shared between fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

/// How a fake step behaves when invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail,
    Hang,
}

async fn act(behavior: Behavior, subsystem: &str) -> Result<(), SubsystemError> {
    // Yield so overlapping steps would interleave in the journal.
    tokio::time::sleep(Duration::from_millis(10)).await;
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err(SubsystemError::connect(subsystem, "simulated failure")),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

pub struct FakeDatabase {
    journal: Journal,
    pub init: Behavior,
    pub close: Behavior,
    initialized: AtomicBool,
    close_calls: AtomicUsize,
}

impl FakeDatabase {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            init: Behavior::Succeed,
            close: Behavior::Succeed,
            initialized: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_init(mut self) -> Self {
        self.init = Behavior::Fail;
        self
    }

    pub fn hanging_init(mut self) -> Self {
        self.init = Behavior::Hang;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for FakeDatabase {
    fn name(&self) -> &str {
        "fake-db"
    }

    async fn initialize(&self) -> Result<(), SubsystemError> {
        self.journal.record("database.initialize.begin");
        act(self.init, self.name()).await?;
        self.initialized.store(true, Ordering::SeqCst);
        self.journal.record("database.initialize.end");
        Ok(())
    }

    async fn close(&self) -> Result<(), SubsystemError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record("database.close.begin");
        act(self.close, self.name()).await?;
        self.initialized.store(false, Ordering::SeqCst);
        self.journal.record("database.close.end");
        Ok(())
    }
}

pub struct FakeBroker {
    journal: Journal,
    pub start: Behavior,
    pub close: Behavior,
    consuming: AtomicBool,
    start_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl FakeBroker {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            start: Behavior::Succeed,
            close: Behavior::Succeed,
            consuming: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.start = Behavior::Fail;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.close = Behavior::Fail;
        self
    }

    pub fn hanging_close(mut self) -> Self {
        self.close = Behavior::Hang;
        self
    }

    pub fn is_consuming(&self) -> bool {
        self.consuming.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBroker for FakeBroker {
    fn name(&self) -> &str {
        "fake-broker"
    }

    async fn start_consumers(&self) -> Result<(), SubsystemError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record("broker.start_consumers.begin");
        act(self.start, self.name()).await?;
        self.consuming.store(true, Ordering::SeqCst);
        self.journal.record("broker.start_consumers.end");
        Ok(())
    }

    async fn close(&self) -> Result<(), SubsystemError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record("broker.close.begin");
        act(self.close, self.name()).await?;
        self.consuming.store(false, Ordering::SeqCst);
        self.journal.record("broker.close.end");
        Ok(())
    }
}

pub fn lifecycle_config(timeout_secs: u64) -> LifecycleConfig {
    LifecycleConfig {
        startup_step_timeout_secs: timeout_secs,
        shutdown_step_timeout_secs: timeout_secs,
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.service.host = "127.0.0.1".to_string();
    config.lifecycle = lifecycle_config(5);
    config
}
