//! Last-delta trend classification.
//!
//! Only the two most recent readings of a window are compared. There is no
//! smoothing or regression: a single noisy sample flips the direction.

use serde::{Deserialize, Serialize};

use crate::model::SensorReading;

/// Absolute change below which a metric counts as unchanged.
pub const STABLE_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increasing,
    Decreasing,
    Stable,
}

impl Direction {
    pub fn between(previous: f64, current: f64) -> Self {
        let diff = current - previous;
        if diff.abs() < STABLE_EPSILON {
            Direction::Stable
        } else if diff > 0.0 {
            Direction::Increasing
        } else {
            Direction::Decreasing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub moisture_trend: Direction,
    pub temperature_trend: Direction,
    pub light_trend: Direction,
    pub ph_trend: Direction,
}

/// Classify the last step of `window`, or `None` with fewer than two readings.
pub fn analyze(window: &[SensorReading]) -> Option<Trend> {
    let [.., previous, current] = window else {
        return None;
    };
    Some(Trend {
        moisture_trend: Direction::between(previous.soil_moisture, current.soil_moisture),
        temperature_trend: Direction::between(previous.temperature, current.temperature),
        light_trend: Direction::between(previous.light_level, current.light_level),
        ph_trend: Direction::between(previous.ph, current.ph),
    })
}
