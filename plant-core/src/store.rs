//! Bounded in-memory reading buffer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::model::SensorReading;

/// Readings kept by a fresh store.
pub const DEFAULT_READING_CAPACITY: usize = 100;

/// How the store bounds its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// One cap over all plants together; the oldest reading of any plant
    /// goes first.
    Global(usize),
    /// Independent cap per plant; only that plant's oldest reading goes.
    PerPlant(usize),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::Global(DEFAULT_READING_CAPACITY)
    }
}

/// Append-only reading buffer with time-windowed and latest-value queries.
///
/// Every operation holds the buffer lock for its whole duration so a query
/// never observes a half-applied append.
#[derive(Debug, Default)]
pub struct ReadingStore {
    policy: RetentionPolicy,
    buf: Mutex<VecDeque<SensorReading>>,
}

impl ReadingStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            buf: Mutex::new(VecDeque::new()),
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SensorReading>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `reading`, evicting per the retention policy.
    pub fn append(&self, reading: SensorReading) {
        let mut buf = self.lock();
        let plant_id = reading.plant_id.clone();
        buf.push_back(reading);

        match self.policy {
            RetentionPolicy::Global(cap) => {
                while buf.len() > cap {
                    buf.pop_front();
                }
            }
            RetentionPolicy::PerPlant(cap) => {
                let mut held = buf.iter().filter(|r| r.plant_id == plant_id).count();
                while held > cap {
                    match buf.iter().position(|r| r.plant_id == plant_id) {
                        Some(idx) => {
                            buf.remove(idx);
                            held -= 1;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    /// Most recently appended reading for `plant_id`.
    pub fn latest(&self, plant_id: &str) -> Option<SensorReading> {
        self.lock()
            .iter()
            .rev()
            .find(|r| r.plant_id == plant_id)
            .cloned()
    }

    /// Readings for `plant_id` no older than `duration` before now.
    pub fn window(&self, plant_id: &str, duration: Duration) -> Vec<SensorReading> {
        self.window_at(plant_id, duration, Utc::now())
    }

    /// Readings for `plant_id` with `timestamp >= now - duration`, oldest first.
    ///
    /// A cutoff earlier than the representable range covers every reading.
    pub fn window_at(
        &self,
        plant_id: &str,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Vec<SensorReading> {
        let cutoff = now
            .checked_sub_signed(duration)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.lock()
            .iter()
            .filter(|r| r.plant_id == plant_id && r.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
