//! Simulated sensor source used when no hardware is attached.

use chrono::{DateTime, Utc};
use plant_core::{Metrics, PlantRegistry, SensorReading};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Floor the simulated battery never drains below.
const BATTERY_FLOOR: f64 = 20.0;
const BATTERY_DRAIN_PER_READING: f64 = 0.1;

/// A metric band and how far a sample may wander from its midpoint.
#[derive(Debug, Clone, Copy)]
struct Band {
    min: f64,
    max: f64,
    variance: f64,
}

const SOIL_MOISTURE: Band = Band {
    min: 45.0,
    max: 55.0,
    variance: 5.0,
};
const TEMPERATURE: Band = Band {
    min: 20.0,
    max: 25.0,
    variance: 2.0,
};
const LIGHT_LEVEL: Band = Band {
    min: 250.0,
    max: 350.0,
    variance: 50.0,
};
const PH: Band = Band {
    min: 6.2,
    max: 6.8,
    variance: 0.3,
};
const HUMIDITY: Band = Band {
    min: 45.0,
    max: 65.0,
    variance: 5.0,
};

/// Produces one reading per call, cycling over the registered plants.
#[derive(Debug)]
pub struct Simulator {
    rng: StdRng,
    produced: u64,
    cursor: usize,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            produced: 0,
            cursor: 0,
        }
    }

    /// Readings produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Next reading for the next plant in registration order, or `None` when
    /// no plant is registered.
    pub fn next_reading(
        &mut self,
        registry: &PlantRegistry,
        now: DateTime<Utc>,
    ) -> Option<SensorReading> {
        let ids = registry.ids();
        if ids.is_empty() {
            return None;
        }
        let plant_id = &ids[self.cursor % ids.len()];
        self.cursor = self.cursor.wrapping_add(1);

        let ph = (self.sample(PH) * 10.0).round() / 10.0;
        let metrics = Metrics {
            soil_moisture: self.sample(SOIL_MOISTURE),
            temperature: self.sample(TEMPERATURE),
            light_level: self.sample(LIGHT_LEVEL),
            ph: ph.clamp(PH.min, PH.max),
            humidity: self.sample(HUMIDITY),
            battery_level: self.battery(),
        };
        self.produced += 1;
        Some(SensorReading::new(plant_id.as_str(), now, metrics))
    }

    fn sample(&mut self, band: Band) -> f64 {
        let mid = (band.min + band.max) / 2.0;
        let jitter = self.rng.random_range(-1.0..=1.0) * band.variance;
        (mid + jitter).clamp(band.min, band.max)
    }

    fn battery(&self) -> f64 {
        (100.0 - self.produced as f64 * BATTERY_DRAIN_PER_READING).max(BATTERY_FLOOR)
    }
}
