//! Boundary validation for readings and profiles.
//!
//! Inputs arrive with every field optional so that a single pass can report
//! all violations together instead of stopping at the first one.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ValidationErrors;
use crate::model::{Metrics, OptimalRanges, PlantProfile, SensorReading};

const SOIL_MOISTURE_BOUNDS: (f64, f64) = (0.0, 100.0);
const TEMPERATURE_BOUNDS: (f64, f64) = (-20.0, 60.0);
const LIGHT_LEVEL_BOUNDS: (f64, f64) = (0.0, 2000.0);
const PH_BOUNDS: (f64, f64) = (0.0, 14.0);
const HUMIDITY_BOUNDS: (f64, f64) = (0.0, 100.0);
const BATTERY_BOUNDS: (f64, f64) = (0.0, 100.0);

const DEFAULT_LIGHT_LEVEL: f64 = 0.0;
const DEFAULT_PH: f64 = 7.0;
const DEFAULT_HUMIDITY: f64 = 50.0;
const DEFAULT_BATTERY: f64 = 100.0;

// ------------------------------------------------------------------ //
//  Readings                                                           //
// ------------------------------------------------------------------ //

/// A reading as submitted by an external producer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingInput {
    pub plant_id: Option<String>,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub light_level: Option<f64>,
    pub ph: Option<f64>,
    pub humidity: Option<f64>,
    pub battery_level: Option<f64>,
}

fn check_bounds(
    errs: &mut ValidationErrors,
    field: &'static str,
    value: Option<f64>,
    (lo, hi): (f64, f64),
    message: &str,
) {
    if let Some(v) = value {
        if !v.is_finite() || v < lo || v > hi {
            errs.push(field, message);
        }
    }
}

/// Validate `input` and stamp it into a [`SensorReading`] taken at `now`.
pub fn reading(
    input: &ReadingInput,
    now: DateTime<Utc>,
) -> Result<SensorReading, ValidationErrors> {
    reading_with(input, ValidationErrors::default(), now)
}

/// [`reading`], continuing from violations already found while decoding
/// `input`. A field rejected there is not reported again as missing.
pub fn reading_with(
    input: &ReadingInput,
    mut errs: ValidationErrors,
    now: DateTime<Utc>,
) -> Result<SensorReading, ValidationErrors> {
    let plant_id = input
        .plant_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if plant_id.is_none() && !errs.contains("plantId") {
        errs.push("plantId", "plantId is required");
    }
    if input.soil_moisture.is_none() && !errs.contains("soilMoisture") {
        errs.push("soilMoisture", "soilMoisture is required");
    }
    if input.temperature.is_none() && !errs.contains("temperature") {
        errs.push("temperature", "temperature is required");
    }

    check_bounds(
        &mut errs,
        "soilMoisture",
        input.soil_moisture,
        SOIL_MOISTURE_BOUNDS,
        "Soil moisture must be between 0 and 100",
    );
    check_bounds(
        &mut errs,
        "temperature",
        input.temperature,
        TEMPERATURE_BOUNDS,
        "Temperature must be between -20 and 60 degrees Celsius",
    );
    check_bounds(
        &mut errs,
        "lightLevel",
        input.light_level,
        LIGHT_LEVEL_BOUNDS,
        "Light level must be between 0 and 2000 lux",
    );
    check_bounds(&mut errs, "ph", input.ph, PH_BOUNDS, "pH must be between 0 and 14");
    check_bounds(
        &mut errs,
        "humidity",
        input.humidity,
        HUMIDITY_BOUNDS,
        "Humidity must be between 0 and 100",
    );
    check_bounds(
        &mut errs,
        "batteryLevel",
        input.battery_level,
        BATTERY_BOUNDS,
        "Battery level must be between 0 and 100",
    );

    match (plant_id, input.soil_moisture, input.temperature) {
        (Some(plant_id), Some(soil_moisture), Some(temperature)) if errs.is_empty() => {
            let metrics = Metrics {
                soil_moisture,
                temperature,
                light_level: input.light_level.unwrap_or(DEFAULT_LIGHT_LEVEL),
                ph: input.ph.unwrap_or(DEFAULT_PH),
                humidity: input.humidity.unwrap_or(DEFAULT_HUMIDITY),
                battery_level: input.battery_level.unwrap_or(DEFAULT_BATTERY),
            };
            Ok(SensorReading::new(plant_id, now, metrics))
        }
        _ => Err(errs),
    }
}

// ------------------------------------------------------------------ //
//  Profiles                                                           //
// ------------------------------------------------------------------ //

/// A new plant as submitted for registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub species: Option<String>,
    pub location: Option<String>,
    pub optimal_ranges: Option<OptimalRanges>,
    pub planted_date: Option<DateTime<Utc>>,
}

/// Partial change to an existing profile. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub species: Option<String>,
    pub location: Option<String>,
    pub optimal_ranges: Option<OptimalRanges>,
}

fn check_text(
    errs: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
    required: bool,
) {
    match value {
        Some(v) if v.trim().is_empty() => {
            errs.push(field, format!("Valid plant {field} is required"))
        }
        None if required && !errs.contains(field) => {
            errs.push(field, format!("Valid plant {field} is required"))
        }
        _ => {}
    }
}

fn check_ranges(errs: &mut ValidationErrors, ranges: Option<&OptimalRanges>) {
    let Some(ranges) = ranges else { return };
    for (metric, range) in ranges.iter() {
        if !range.is_well_formed() {
            errs.push(
                "optimalRanges",
                format!("{metric} range must be finite with min <= max"),
            );
        }
    }
}

/// Validate a registration and build the profile it describes.
pub fn profile(input: &ProfileInput, now: DateTime<Utc>) -> Result<PlantProfile, ValidationErrors> {
    profile_with(input, ValidationErrors::default(), now)
}

/// [`profile`], continuing from violations already found while decoding.
pub fn profile_with(
    input: &ProfileInput,
    mut errs: ValidationErrors,
    now: DateTime<Utc>,
) -> Result<PlantProfile, ValidationErrors> {
    check_text(&mut errs, "name", input.name.as_deref(), true);
    check_text(&mut errs, "species", input.species.as_deref(), true);
    check_text(&mut errs, "id", input.id.as_deref(), false);
    check_ranges(&mut errs, input.optimal_ranges.as_ref());

    let id = input
        .id
        .as_deref()
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| format!("plant-{}", Uuid::new_v4()));

    errs.into_result(PlantProfile {
        id,
        name: input.name.as_deref().unwrap_or_default().trim().to_string(),
        species: input.species.as_deref().unwrap_or_default().trim().to_string(),
        optimal_ranges: input.optimal_ranges.unwrap_or(OptimalRanges::houseplant()),
        location: input
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string(),
        planted_date: input.planted_date.unwrap_or(now),
        last_watered: None,
    })
}

/// Validate the fields carried by a profile update.
pub fn profile_update(update: &ProfileUpdate) -> Result<(), ValidationErrors> {
    profile_update_with(update, ValidationErrors::default())
}

/// [`profile_update`], continuing from violations already found while decoding.
pub fn profile_update_with(
    update: &ProfileUpdate,
    mut errs: ValidationErrors,
) -> Result<(), ValidationErrors> {
    check_text(&mut errs, "name", update.name.as_deref(), false);
    check_text(&mut errs, "species", update.species.as_deref(), false);
    check_ranges(&mut errs, update.optimal_ranges.as_ref());
    errs.into_result(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Range;

    fn full_input() -> ReadingInput {
        ReadingInput {
            plant_id: Some("plant-1".into()),
            soil_moisture: Some(50.0),
            temperature: Some(22.0),
            light_level: Some(300.0),
            ph: Some(6.5),
            humidity: Some(55.0),
            battery_level: Some(90.0),
        }
    }

    #[test]
    fn valid_reading_is_stamped() {
        let now = Utc::now();
        let r = reading(&full_input(), now).unwrap();
        assert_eq!(r.plant_id, "plant-1");
        assert_eq!(r.timestamp, now);
        assert_eq!(r.battery_level, 90.0);
    }

    #[test]
    fn optional_metrics_take_defaults() {
        let input = ReadingInput {
            plant_id: Some("plant-1".into()),
            soil_moisture: Some(50.0),
            temperature: Some(22.0),
            ..Default::default()
        };
        let r = reading(&input, Utc::now()).unwrap();
        assert_eq!(r.light_level, 0.0);
        assert_eq!(r.ph, 7.0);
        assert_eq!(r.humidity, 50.0);
        assert_eq!(r.battery_level, 100.0);
    }

    #[test]
    fn every_violation_is_reported() {
        let input = ReadingInput {
            plant_id: Some("  ".into()),
            soil_moisture: Some(120.0),
            temperature: None,
            light_level: Some(-1.0),
            ph: Some(15.0),
            humidity: Some(f64::NAN),
            battery_level: Some(50.0),
        };
        let errs = reading(&input, Utc::now()).unwrap_err();
        let fields: Vec<_> = errs.fields().collect();
        assert_eq!(
            fields,
            vec!["plantId", "temperature", "soilMoisture", "lightLevel", "ph", "humidity"]
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let input = ReadingInput {
            soil_moisture: Some(100.0),
            temperature: Some(-20.0),
            light_level: Some(2000.0),
            ph: Some(0.0),
            ..full_input()
        };
        assert!(reading(&input, Utc::now()).is_ok());
    }

    #[test]
    fn profile_requires_name_and_species() {
        let errs = profile(&ProfileInput::default(), Utc::now()).unwrap_err();
        assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["name", "species"]);
    }

    #[test]
    fn profile_gets_default_ranges_and_location() {
        let input = ProfileInput {
            name: Some("Fern".into()),
            species: Some("Nephrolepis exaltata".into()),
            ..Default::default()
        };
        let p = profile(&input, Utc::now()).unwrap();
        assert!(p.id.starts_with("plant-"));
        assert_eq!(p.location, "Unknown");
        assert_eq!(p.optimal_ranges, OptimalRanges::houseplant());
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut ranges = OptimalRanges::houseplant();
        ranges.ph = Range::new(7.0, 6.0);
        ranges.temperature = Range::new(30.0, 10.0);
        let update = ProfileUpdate {
            optimal_ranges: Some(ranges),
            ..Default::default()
        };
        let errs = profile_update(&update).unwrap_err();
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(profile_update(&ProfileUpdate::default()).is_ok());
    }

    #[test]
    fn decode_errors_are_kept_and_not_doubled() {
        let mut decoded = ValidationErrors::default();
        decoded.push("soilMoisture", "soilMoisture must be a number");
        decoded.push("temperature", "temperature must be a number");
        let input = ReadingInput {
            plant_id: Some("plant-1".into()),
            ph: Some(99.0),
            ..Default::default()
        };
        let errs = reading_with(&input, decoded, Utc::now()).unwrap_err();
        assert_eq!(
            errs.fields().collect::<Vec<_>>(),
            vec!["soilMoisture", "temperature", "ph"]
        );
    }

    #[test]
    fn profile_decode_errors_replace_missing() {
        let mut decoded = ValidationErrors::default();
        decoded.push("name", "name must be a string");
        let input = ProfileInput {
            species: Some("Ficus lyrata".into()),
            ..Default::default()
        };
        let errs = profile_with(&input, decoded, Utc::now()).unwrap_err();
        assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["name"]);
    }
}
