//! Readings, plant profiles and alerts.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ------------------------------------------------------------------ //
//  Readings                                                           //
// ------------------------------------------------------------------ //

/// One timestamped sample of a plant's environmental metrics.
///
/// Readings are immutable once created; the store hands out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: Uuid,
    pub plant_id: String,
    pub timestamp: DateTime<Utc>,
    /// Percent volumetric water content.
    pub soil_moisture: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Lux.
    pub light_level: f64,
    pub ph: f64,
    /// Percent relative humidity.
    pub humidity: f64,
    /// Percent remaining on the sensor battery.
    pub battery_level: f64,
}

/// Metric values of a reading, without identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub soil_moisture: f64,
    pub temperature: f64,
    pub light_level: f64,
    pub ph: f64,
    pub humidity: f64,
    pub battery_level: f64,
}

impl SensorReading {
    /// Stamp a fresh reading with a new id.
    pub fn new(plant_id: impl Into<String>, timestamp: DateTime<Utc>, m: Metrics) -> Self {
        Self {
            id: Uuid::new_v4(),
            plant_id: plant_id.into(),
            timestamp,
            soil_moisture: m.soil_moisture,
            temperature: m.temperature,
            light_level: m.light_level,
            ph: m.ph,
            humidity: m.humidity,
            battery_level: m.battery_level,
        }
    }
}

// ------------------------------------------------------------------ //
//  Profiles                                                           //
// ------------------------------------------------------------------ //

/// Inclusive `[min, max]` band. Serialised as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Both bounds finite and `min <= max`.
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl From<(f64, f64)> for Range {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl From<Range> for (f64, f64) {
    fn from(r: Range) -> Self {
        (r.min, r.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalRanges {
    pub soil_moisture: Range,
    pub temperature: Range,
    pub light_level: Range,
    pub ph: Range,
}

impl OptimalRanges {
    /// Ranges given to a newly registered plant that brings none of its own.
    pub const fn houseplant() -> Self {
        Self {
            soil_moisture: Range::new(40.0, 60.0),
            temperature: Range::new(18.0, 25.0),
            light_level: Range::new(200.0, 400.0),
            ph: Range::new(6.0, 7.0),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Range)> {
        [
            ("soilMoisture", self.soil_moisture),
            ("temperature", self.temperature),
            ("lightLevel", self.light_level),
            ("ph", self.ph),
        ]
        .into_iter()
    }
}

/// A plant's identity plus its optimal metric ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantProfile {
    pub id: String,
    pub name: String,
    pub species: String,
    pub optimal_ranges: OptimalRanges,
    pub location: String,
    pub planted_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watered: Option<DateTime<Utc>>,
}

impl PlantProfile {
    /// The profile every fresh deployment starts with.
    pub fn seed() -> Self {
        Self {
            id: "plant-1".to_string(),
            name: "Monstera Deliciosa".to_string(),
            species: "Monstera deliciosa".to_string(),
            optimal_ranges: OptimalRanges {
                soil_moisture: Range::new(40.0, 60.0),
                temperature: Range::new(18.0, 24.0),
                light_level: Range::new(200.0, 400.0),
                ph: Range::new(6.0, 7.0),
            },
            location: "Living Room".to_string(),
            planted_date: Utc
                .with_ymd_and_hms(2024, 1, 15, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            last_watered: None,
        }
    }
}

// ------------------------------------------------------------------ //
//  Alerts                                                             //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Info,
    Warning,
    Critical,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::Info => "info",
            AlertType::Warning => "warning",
            AlertType::Critical => "critical",
        }
    }

    /// Priority attached to alerts of this type; higher is more urgent.
    pub fn priority(self) -> u8 {
        match self {
            AlertType::Info => 1,
            AlertType::Warning => 2,
            AlertType::Critical => 3,
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A raised, priority-ranked, resolvable notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub plant_id: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub priority: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_serialises_as_pair() {
        let r = Range::new(6.0, 7.0);
        assert_eq!(serde_json::to_value(r).unwrap(), serde_json::json!([6.0, 7.0]));
        let back: Range = serde_json::from_str("[40, 60]").unwrap();
        assert_eq!(back, Range::new(40.0, 60.0));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let r = Range::new(40.0, 60.0);
        assert!(r.contains(40.0));
        assert!(r.contains(60.0));
        assert!(!r.contains(39.99));
        assert!(!r.contains(60.01));
    }

    #[test]
    fn inverted_or_nan_range_is_not_well_formed() {
        assert!(Range::new(1.0, 1.0).is_well_formed());
        assert!(!Range::new(2.0, 1.0).is_well_formed());
        assert!(!Range::new(f64::NAN, 1.0).is_well_formed());
    }

    #[test]
    fn alert_uses_type_key_on_the_wire() {
        let alert = Alert {
            id: Uuid::nil(),
            plant_id: "plant-1".into(),
            kind: AlertType::Critical,
            message: "dry".into(),
            timestamp: Utc::now(),
            resolved: false,
            priority: 3,
        };
        let v = serde_json::to_value(&alert).unwrap();
        assert_eq!(v["type"], "critical");
        assert_eq!(v["plantId"], "plant-1");
        assert_eq!(v["priority"], 3);
    }

    #[test]
    fn seed_profile_matches_reference_plant() {
        let p = PlantProfile::seed();
        assert_eq!(p.id, "plant-1");
        assert_eq!(p.optimal_ranges.temperature, Range::new(18.0, 24.0));
        assert!(p.optimal_ranges.iter().all(|(_, r)| r.is_well_formed()));
        assert!(p.last_watered.is_none());
    }
}
