//! RabbitMQ relay for plant topic payloads.
//!
//! [`AmqpRelay::publish`] only enqueues; a background task owns the channel
//! and performs the actual `basic_publish`, so a slow broker never stalls the
//! driver.

use std::sync::Arc;

use anyhow::{Context, Result};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use plant_core::{Broadcaster, Payload};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Topic exchange every payload is published to.
pub const EXCHANGE: &str = "plant.events";

type Outgoing = (String, Arc<Payload>);

pub struct AmqpRelay {
    tx: mpsc::Sender<Outgoing>,
}

/// `plant.<plantId>.<event>`, e.g. `plant.plant-1.sensor-data`.
pub fn routing_key(topic: &str, payload: &Payload) -> String {
    format!("plant.{topic}.{}", payload.event_name())
}

impl AmqpRelay {
    /// Connect, declare the exchange and start the publisher task.
    ///
    /// The task drains its queue and closes the connection once the relay is
    /// dropped.
    pub async fn connect(url: &str, queue: usize) -> Result<(Self, JoinHandle<()>)> {
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;
        let chan = conn
            .create_channel()
            .await
            .context("Failed to open RabbitMQ channel")?;
        chan.exchange_declare(
            EXCHANGE,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare exchange")?;
        info!(exchange = EXCHANGE, "RabbitMQ relay ready");

        let (tx, rx) = mpsc::channel(queue.max(1));
        let handle = tokio::spawn(forward(conn, chan, rx));
        Ok((Self { tx }, handle))
    }
}

impl Broadcaster for AmqpRelay {
    fn publish(&self, topic: &str, payload: Arc<Payload>) {
        match self.tx.try_send((topic.to_string(), payload)) {
            Ok(()) => {}
            Err(TrySendError::Full((topic, payload))) => {
                warn!(
                    topic = %topic,
                    event = payload.event_name(),
                    "AMQP relay queue full, dropping payload"
                );
            }
            Err(TrySendError::Closed(_)) => {
                warn!(topic, "AMQP relay stopped, dropping payload");
            }
        }
    }
}

async fn forward(conn: Connection, chan: Channel, mut rx: mpsc::Receiver<Outgoing>) {
    while let Some((topic, payload)) = rx.recv().await {
        let body = match serde_json::to_vec(&*payload) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, topic = %topic, "failed to encode payload");
                continue;
            }
        };
        let key = routing_key(&topic, &payload);
        let result = chan
            .basic_publish(
                EXCHANGE,
                &key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await;
        match result {
            Ok(_) => debug!(routing_key = %key, "payload relayed"),
            Err(e) => warn!(error = %e, routing_key = %key, "AMQP publish failed (non-fatal)"),
        }
    }

    if let Err(e) = conn.close(200, "relay stopped").await {
        debug!(error = %e, "RabbitMQ close failed");
    }
    info!("RabbitMQ relay stopped");
}
