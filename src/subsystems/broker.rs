//! Message broker contracts.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::subsystems::SubsystemError;

/// Lifecycle contract of the message broker client.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Begin background consumption. Returns once consumers are running;
    /// must not block on the consumption itself.
    async fn start_consumers(&self) -> Result<(), SubsystemError>;

    /// Stop consuming and release the connection. Safe to call more than once.
    async fn close(&self) -> Result<(), SubsystemError>;
}

/// One delivered broker entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub stream: String,
    pub id: String,
    pub fields: HashMap<String, String>,
}

/// Processes delivered entries. An `Err` leaves the entry unacknowledged
/// so it is redelivered.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &BrokerMessage) -> Result<(), SubsystemError>;
}

/// Handler that only records deliveries in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: &BrokerMessage) -> Result<(), SubsystemError> {
        tracing::info!(
            stream = %message.stream,
            id = %message.id,
            event_type = message.fields.get("type").map(String::as_str).unwrap_or("unknown"),
            "Received broker message"
        );
        Ok(())
    }
}
