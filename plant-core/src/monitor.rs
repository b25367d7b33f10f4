//! Query boundary over the reading store, alert log and registry.

use chrono::Duration;
use uuid::Uuid;

use crate::alerts::AlertEngine;
use crate::health::{self, HealthScore};
use crate::model::{Alert, PlantProfile, SensorReading};
use crate::registry::PlantRegistry;
use crate::store::ReadingStore;
use crate::trend::{self, Trend};

/// Default history window, in hours.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Health of a plant's latest reading.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantHealth {
    pub profile: PlantProfile,
    pub reading: SensorReading,
    pub score: HealthScore,
}

/// A window of readings and the trend across it.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub readings: Vec<SensorReading>,
    pub trend: Option<Trend>,
}

/// The three stores, each behind its own lock.
#[derive(Debug, Default)]
pub struct PlantMonitor {
    pub readings: ReadingStore,
    pub alerts: AlertEngine,
    pub registry: PlantRegistry,
}

impl PlantMonitor {
    pub fn new(readings: ReadingStore, alerts: AlertEngine, registry: PlantRegistry) -> Self {
        Self {
            readings,
            alerts,
            registry,
        }
    }

    /// Store `reading`, then raise its alerts against the registered profile.
    pub fn ingest(&self, reading: SensorReading) -> Vec<Alert> {
        let profile = self.registry.get(&reading.plant_id);
        self.readings.append(reading.clone());
        self.alerts.evaluate(&reading, profile.as_ref())
    }

    pub fn latest(&self, plant_id: &str) -> Option<SensorReading> {
        self.readings.latest(plant_id)
    }

    /// Readings of the last `hours`, oldest first. Negative windows are empty;
    /// windows too large for a timestamp cover the whole buffer.
    pub fn window(&self, plant_id: &str, hours: i64) -> Vec<SensorReading> {
        if hours < 0 {
            return Vec::new();
        }
        let span = Duration::try_hours(hours).unwrap_or(Duration::MAX);
        self.readings.window(plant_id, span)
    }

    pub fn active_alerts(&self, plant_id: Option<&str>) -> Vec<Alert> {
        self.alerts.active(plant_id)
    }

    pub fn resolve(&self, alert_id: Uuid) -> bool {
        self.alerts.resolve(alert_id)
    }

    /// Score the latest reading; `None` without a profile or a reading.
    pub fn score(&self, plant_id: &str) -> Option<PlantHealth> {
        let profile = self.registry.get(plant_id)?;
        let reading = self.readings.latest(plant_id)?;
        let score = health::score(&reading, &profile);
        Some(PlantHealth {
            profile,
            reading,
            score,
        })
    }

    /// Readings of the last `hours` with their trend, taken from one snapshot.
    ///
    /// The trend is `None` with fewer than two readings in the window.
    pub fn history(&self, plant_id: &str, hours: i64) -> History {
        let readings = self.window(plant_id, hours);
        let trend = trend::analyze(&readings);
        History { readings, trend }
    }
}
