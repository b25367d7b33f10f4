//! Per-plant topic fan-out.
//!
//! [`Broadcaster::publish`] never blocks the caller. [`TopicHub`] gives each
//! subscriber its own bounded queue; a full queue drops the payload for that
//! subscriber only, and closed subscribers are pruned on the next publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::model::{Alert, SensorReading};

/// Per-subscriber queue depth of a default hub.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// What travels on a plant's topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Payload {
    #[serde(rename = "sensor-data")]
    Reading(SensorReading),
    /// Every alert raised by one reading, delivered together.
    #[serde(rename = "alerts")]
    Alerts(Vec<Alert>),
}

impl Payload {
    pub fn event_name(&self) -> &'static str {
        match self {
            Payload::Reading(_) => "sensor-data",
            Payload::Alerts(_) => "alerts",
        }
    }
}

/// Publish side of the real-time transport.
pub trait Broadcaster: Send + Sync {
    /// Deliver `payload` to current subscribers of `topic`, best effort.
    fn publish(&self, topic: &str, payload: Arc<Payload>);
}

// ------------------------------------------------------------------ //
//  TopicHub                                                           //
// ------------------------------------------------------------------ //

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Arc<Payload>>,
}

/// In-process broadcaster keyed by plant id.
pub struct TopicHub {
    buffer: usize,
    next_id: AtomicU64,
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,
}

/// Receiving end of one topic subscription.
pub struct Subscription {
    pub topic: String,
    pub id: u64,
    rx: mpsc::Receiver<Arc<Payload>>,
}

impl Subscription {
    /// Next payload, or `None` once the hub has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<Arc<Payload>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<Payload>> {
        self.rx.try_recv().ok()
    }
}

impl TopicHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            next_id: AtomicU64::new(1),
            topics: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        debug!(topic, subscriber = id, "subscribed");
        Subscription {
            topic: topic.to_string(),
            id,
            rx,
        }
    }

    pub fn unsubscribe(&self, topic: &str, id: u64) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(subs) = topics.get_mut(topic) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                topics.remove(topic);
            }
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|s| !s.tx.is_closed()).count())
    }
}

impl Default for TopicHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl Broadcaster for TopicHub {
    fn publish(&self, topic: &str, payload: Arc<Payload>) {
        let mut closed = false;
        {
            let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
            let Some(subs) = topics.get(topic) else {
                return;
            };
            for sub in subs {
                match sub.tx.try_send(Arc::clone(&payload)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            topic,
                            subscriber = sub.id,
                            event = payload.event_name(),
                            "subscriber queue full, dropping payload"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed = true,
                }
            }
        }

        if closed {
            let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(subs) = topics.get_mut(topic) {
                subs.retain(|s| !s.tx.is_closed());
                if subs.is_empty() {
                    topics.remove(topic);
                }
            }
        }
    }
}

// ------------------------------------------------------------------ //
//  FanOut                                                             //
// ------------------------------------------------------------------ //

/// Forwards every publish to each inner broadcaster in order.
#[derive(Default)]
pub struct FanOut {
    targets: Vec<Arc<dyn Broadcaster>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn Broadcaster>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Broadcaster for FanOut {
    fn publish(&self, topic: &str, payload: Arc<Payload>) {
        for t in &self.targets {
            t.publish(topic, Arc::clone(&payload));
        }
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //
