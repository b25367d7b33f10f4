//! Lenient decoding of JSON request bodies.
//!
//! Each field is decoded on its own so that a wrongly typed value becomes a
//! [`ValidationErrors`] entry next to the range checks, instead of failing
//! the whole body before validation runs.

use chrono::{DateTime, Utc};
use plant_core::validate::{ProfileInput, ProfileUpdate, ReadingInput};
use plant_core::{OptimalRanges, ValidationErrors};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::WaterRequest;

/// A decoded body plus the type violations found while decoding it.
pub type Decoded<T> = (T, ValidationErrors);

const NUMBER: &str = "a number";
const STRING: &str = "a string";
const RANGES: &str = "an object of [min, max] ranges";
const TIMESTAMP: &str = "an RFC 3339 timestamp";

struct Fields {
    map: Map<String, Value>,
    errs: ValidationErrors,
}

impl Fields {
    fn parse(bytes: &[u8]) -> Result<Self, ValidationErrors> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(Self {
                map,
                errs: ValidationErrors::default(),
            }),
            _ => {
                let mut errs = ValidationErrors::default();
                errs.push("body", "Request body must be a JSON object");
                Err(errs)
            }
        }
    }

    /// Absent and `null` both read as `None`.
    fn get<T: DeserializeOwned>(&mut self, key: &'static str, expected: &str) -> Option<T> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => match serde_json::from_value(v.clone()) {
                Ok(t) => Some(t),
                Err(_) => {
                    self.errs.push(key, format!("{key} must be {expected}"));
                    None
                }
            },
        }
    }
}

/// Body of `POST /api/sensors/reading`.
pub fn reading_input(bytes: &[u8]) -> Result<Decoded<ReadingInput>, ValidationErrors> {
    let mut f = Fields::parse(bytes)?;
    let input = ReadingInput {
        plant_id: f.get("plantId", STRING),
        soil_moisture: f.get("soilMoisture", NUMBER),
        temperature: f.get("temperature", NUMBER),
        light_level: f.get("lightLevel", NUMBER),
        ph: f.get("ph", NUMBER),
        humidity: f.get("humidity", NUMBER),
        battery_level: f.get("batteryLevel", NUMBER),
    };
    Ok((input, f.errs))
}

/// Body of `POST /api/plants`.
pub fn profile_input(bytes: &[u8]) -> Result<Decoded<ProfileInput>, ValidationErrors> {
    let mut f = Fields::parse(bytes)?;
    let input = ProfileInput {
        id: f.get("id", STRING),
        name: f.get("name", STRING),
        species: f.get("species", STRING),
        location: f.get("location", STRING),
        optimal_ranges: f.get::<OptimalRanges>("optimalRanges", RANGES),
        planted_date: f.get::<DateTime<Utc>>("plantedDate", TIMESTAMP),
    };
    Ok((input, f.errs))
}

/// Body of `PUT /api/plants/:plant_id`.
pub fn profile_update(bytes: &[u8]) -> Result<Decoded<ProfileUpdate>, ValidationErrors> {
    let mut f = Fields::parse(bytes)?;
    let update = ProfileUpdate {
        name: f.get("name", STRING),
        species: f.get("species", STRING),
        location: f.get("location", STRING),
        optimal_ranges: f.get("optimalRanges", RANGES),
    };
    Ok((update, f.errs))
}

/// Body of `POST /api/plants/:plant_id/water`. An empty body means no
/// details were given; anything else must be a well-formed object.
pub fn water_request(bytes: &[u8]) -> Result<WaterRequest, ValidationErrors> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(WaterRequest::default());
    }
    let mut f = Fields::parse(bytes)?;
    let req = WaterRequest {
        amount: f.get("amount", "a JSON value"),
        notes: f.get("notes", STRING),
    };
    f.errs.into_result(req)
}
