//! Redis Streams-backed message broker.
//!
//! Each configured stream is read through a consumer group:
//! - **Group bootstrap**: `XGROUP CREATE ... MKSTREAM`, an existing group is fine
//! - **Delivery**: one background task per stream loops on `XREADGROUP ... BLOCK`
//! - **Acknowledgement**: entries are `XACK`ed only after the handler succeeds,
//!   failed entries stay pending for redelivery
//! - **Close**: a blocked read is abandoned, a batch already read is finished
//! - **Reconnect**: read errors drop the connection and retry with backoff

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::config::{BrokerConfig, ConsumerConfig};
use crate::lifecycle::Shutdown;
use crate::resilience::Backoff;
use crate::subsystems::broker::{BrokerMessage, MessageBroker, MessageHandler};
use crate::subsystems::SubsystemError;

const SUBSYSTEM: &str = "redis-streams";

/// Consumer-group client over Redis Streams.
pub struct RedisStreamsBroker {
    client: redis::Client,
    config: BrokerConfig,
    consumer_name: String,
    handler: Arc<dyn MessageHandler>,
    running: Mutex<Option<RunningConsumers>>,
}

struct RunningConsumers {
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl RedisStreamsBroker {
    /// Create a broker client. No connection is made until `start_consumers`.
    pub fn new(
        config: BrokerConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, SubsystemError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| SubsystemError::connect(SUBSYSTEM, e))?;
        let consumer_name = format!("{}-{}", config.consumer_name_prefix, uuid::Uuid::new_v4());

        Ok(Self {
            client,
            config,
            consumer_name,
            handler,
            running: Mutex::new(None),
        })
    }

    /// Name this process uses inside every consumer group.
    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Number of consumer tasks currently running.
    pub async fn active_consumers(&self) -> usize {
        self.running
            .lock()
            .await
            .as_ref()
            .map(|r| r.tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    async fn ensure_group(
        conn: &mut MultiplexedConnection,
        binding: &ConsumerConfig,
    ) -> Result<(), SubsystemError> {
        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&binding.stream, &binding.group, "$")
            .await;

        match created {
            Ok(()) => {
                tracing::info!(stream = %binding.stream, group = %binding.group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(SubsystemError::consumer(SUBSYSTEM, e)),
        }
    }
}

#[async_trait]
impl MessageBroker for RedisStreamsBroker {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    async fn start_consumers(&self) -> Result<(), SubsystemError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("Broker consumers already running");
            return Ok(());
        }

        let mut conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| SubsystemError::connect(SUBSYSTEM, e))?;

        for binding in &self.config.consumers {
            Self::ensure_group(&mut conn, binding).await?;
        }

        let shutdown = Shutdown::new();
        let tasks = self
            .config
            .consumers
            .iter()
            .map(|binding| {
                let task = ConsumerTask {
                    source: GroupReader {
                        client: self.client.clone(),
                        conn: None,
                        binding: binding.clone(),
                        consumer_name: self.consumer_name.clone(),
                        prefetch: self.config.prefetch,
                        block_ms: self.config.block_ms,
                    },
                    handler: self.handler.clone(),
                    backoff: Backoff::from_millis(
                        self.config.reconnect_base_delay_ms,
                        self.config.reconnect_max_delay_ms,
                    ),
                };
                tokio::spawn(task.run(shutdown.subscribe()))
            })
            .collect::<Vec<_>>();

        tracing::info!(
            consumers = tasks.len(),
            consumer_name = %self.consumer_name,
            "Broker consumers started"
        );
        *running = Some(RunningConsumers { shutdown, tasks });
        Ok(())
    }

    async fn close(&self) -> Result<(), SubsystemError> {
        let Some(running) = self.running.lock().await.take() else {
            tracing::debug!("Broker consumers not running, nothing to close");
            return Ok(());
        };

        running.shutdown.trigger();

        let mut panicked = 0usize;
        for task in running.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Broker consumer task ended abnormally");
                panicked += 1;
            }
        }

        if panicked > 0 {
            return Err(SubsystemError::close(
                SUBSYSTEM,
                format!("{} consumer task(s) ended abnormally", panicked),
            ));
        }

        tracing::info!("Broker consumers stopped");
        Ok(())
    }
}

/// Read and acknowledge operations of one stream, as seen by a consumer loop.
#[async_trait]
trait EntrySource: Send {
    fn stream(&self) -> &str;

    /// Block for the next batch of entries delivered to this consumer.
    async fn read(&mut self) -> redis::RedisResult<Vec<BrokerMessage>>;

    async fn ack(&mut self, ids: &[String]) -> redis::RedisResult<()>;

    /// Forget the current connection after a failure.
    fn reset(&mut self);
}

/// `XREADGROUP`/`XACK` against one stream through a lazily opened connection.
struct GroupReader {
    client: redis::Client,
    conn: Option<MultiplexedConnection>,
    binding: ConsumerConfig,
    consumer_name: String,
    prefetch: usize,
    block_ms: u64,
}

#[async_trait]
impl EntrySource for GroupReader {
    fn stream(&self) -> &str {
        &self.binding.stream
    }

    async fn read(&mut self) -> redis::RedisResult<Vec<BrokerMessage>> {
        if self.conn.is_none() {
            self.conn = Some(self.client.get_multiplexed_tokio_connection().await?);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Ok(Vec::new());
        };

        let options = StreamReadOptions::default()
            .group(&self.binding.group, &self.consumer_name)
            .count(self.prefetch)
            .block(self.block_ms as usize);

        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.binding.stream], &[">"], &options)
            .await?;

        let mut messages = Vec::new();
        for key in reply.map(|r| r.keys).unwrap_or_default() {
            for entry in key.ids {
                messages.push(BrokerMessage {
                    stream: key.key.clone(),
                    fields: decode_fields(&entry.map),
                    id: entry.id,
                });
            }
        }
        Ok(messages)
    }

    async fn ack(&mut self, ids: &[String]) -> redis::RedisResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err((redis::ErrorKind::IoError, "connection lost before acknowledgement").into());
        };
        let _: i64 = conn
            .xack(&self.binding.stream, &self.binding.group, ids)
            .await?;
        Ok(())
    }

    fn reset(&mut self) {
        self.conn = None;
    }
}

/// Background consumer for a single stream.
///
/// Only the blocking read is abandoned on shutdown. A batch that has been
/// read is handled and acknowledged in full before the stop signal is
/// looked at again.
struct ConsumerTask<S> {
    source: S,
    handler: Arc<dyn MessageHandler>,
    backoff: Backoff,
}

impl<S: EntrySource> ConsumerTask<S> {
    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(stream = %self.source.stream(), "Consumer loop starting");

        let mut failures = 0u32;

        loop {
            let batch = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                batch = self.source.read() => batch,
            };

            let outcome = match batch {
                Ok(messages) => self.dispatch(messages).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(_) => failures = 0,
                Err(e) => {
                    self.source.reset();
                    failures = failures.saturating_add(1);
                    let delay = self.backoff.delay(failures);
                    tracing::warn!(
                        stream = %self.source.stream(),
                        error = %e,
                        attempt = failures,
                        delay = ?delay,
                        "Broker read failed, reconnecting"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(stream = %self.source.stream(), "Consumer loop stopped");
    }

    /// Hand every entry to the handler, then acknowledge the ones it accepted.
    async fn dispatch(&mut self, messages: Vec<BrokerMessage>) -> redis::RedisResult<usize> {
        let mut handled = Vec::with_capacity(messages.len());
        for message in &messages {
            match self.handler.handle(message).await {
                Ok(()) => handled.push(message.id.clone()),
                Err(e) => tracing::error!(
                    stream = %message.stream,
                    id = %message.id,
                    error = %e,
                    "Message handler failed, leaving entry pending"
                ),
            }
        }

        self.source.ack(&handled).await?;
        Ok(handled.len())
    }
}

fn decode_fields(map: &HashMap<String, redis::Value>) -> HashMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| {
            redis::from_redis_value::<String>(v)
                .ok()
                .map(|v| (k.clone(), v))
        })
        .collect()
}
