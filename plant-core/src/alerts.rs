//! Threshold alerting and the bounded alert log.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::model::{Alert, AlertType, PlantProfile, SensorReading};

/// Alerts kept by a fresh engine.
pub const DEFAULT_ALERT_CAPACITY: usize = 50;

/// Battery percentage under which the sensor itself needs attention.
pub const LOW_BATTERY_PCT: f64 = 20.0;

// ------------------------------------------------------------------ //
//  Threshold checks                                                   //
// ------------------------------------------------------------------ //

/// An out-of-range condition found in a reading, before it becomes an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub kind: AlertType,
    pub message: String,
}

impl Finding {
    fn new(kind: AlertType, message: String) -> Self {
        Self { kind, message }
    }
}

/// Every condition `reading` violates under `profile`, in check order.
///
/// Pure: the same reading and profile always give the same findings.
pub fn check(reading: &SensorReading, profile: &PlantProfile) -> Vec<Finding> {
    let ranges = &profile.optimal_ranges;
    let name = &profile.name;
    let mut found = Vec::new();

    if reading.soil_moisture < ranges.soil_moisture.min {
        found.push(Finding::new(
            AlertType::Critical,
            format!("{name} needs watering - soil moisture at {}%", reading.soil_moisture),
        ));
    } else if reading.soil_moisture > ranges.soil_moisture.max {
        found.push(Finding::new(
            AlertType::Warning,
            format!("{name} may be overwatered - soil moisture at {}%", reading.soil_moisture),
        ));
    }

    if reading.temperature > ranges.temperature.max {
        found.push(Finding::new(
            AlertType::Warning,
            format!("High temperature detected for {name} - {}°C", reading.temperature),
        ));
    } else if reading.temperature < ranges.temperature.min {
        found.push(Finding::new(
            AlertType::Warning,
            format!("Low temperature detected for {name} - {}°C", reading.temperature),
        ));
    }

    // No high-light alert.
    if reading.light_level < ranges.light_level.min {
        found.push(Finding::new(
            AlertType::Info,
            format!("{name} needs more light - current level {} lux", reading.light_level),
        ));
    }

    if reading.battery_level < LOW_BATTERY_PCT {
        found.push(Finding::new(
            AlertType::Warning,
            format!("Low battery on {name} sensor - {}%", reading.battery_level),
        ));
    }

    found
}

// ------------------------------------------------------------------ //
//  Engine                                                             //
// ------------------------------------------------------------------ //

/// Owns the alert log: a FIFO capped at `capacity`, evicting the oldest entry
/// whether or not it was resolved.
#[derive(Debug)]
pub struct AlertEngine {
    capacity: usize,
    log: Mutex<VecDeque<Alert>>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}

impl AlertEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            log: Mutex::new(VecDeque::with_capacity(capacity + 1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Alert>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise alerts for `reading`, log them and return them.
    ///
    /// Without a profile nothing is checked and nothing is logged.
    pub fn evaluate(&self, reading: &SensorReading, profile: Option<&PlantProfile>) -> Vec<Alert> {
        let Some(profile) = profile else {
            return Vec::new();
        };

        let now = Utc::now();
        let raised: Vec<Alert> = check(reading, profile)
            .into_iter()
            .map(|f| Alert {
                id: Uuid::new_v4(),
                plant_id: reading.plant_id.clone(),
                kind: f.kind,
                message: f.message,
                timestamp: now,
                resolved: false,
                priority: f.kind.priority(),
            })
            .collect();

        if !raised.is_empty() {
            let mut log = self.lock();
            log.extend(raised.iter().cloned());
            while log.len() > self.capacity {
                log.pop_front();
            }
        }
        raised
    }

    /// Unresolved alerts, optionally for one plant, most urgent first.
    ///
    /// Equal priorities keep log order.
    pub fn active(&self, plant_id: Option<&str>) -> Vec<Alert> {
        let mut out: Vec<Alert> = self
            .lock()
            .iter()
            .filter(|a| !a.resolved)
            .filter(|a| plant_id.map_or(true, |id| a.plant_id == id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority));
        out
    }

    /// Mark an alert resolved. `false` if it was never logged or was evicted.
    pub fn resolve(&self, alert_id: Uuid) -> bool {
        match self.lock().iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Full log including resolved alerts, oldest first.
    pub fn log(&self) -> Vec<Alert> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ------------------------------------------------------------------ //
//  Tests                                                              //
// ------------------------------------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metrics;

    fn reading(
        soil_moisture: f64,
        temperature: f64,
        light_level: f64,
        battery_level: f64,
    ) -> SensorReading {
        SensorReading::new(
            "plant-1",
            Utc::now(),
            Metrics {
                soil_moisture,
                temperature,
                light_level,
                ph: 6.5,
                humidity: 50.0,
                battery_level,
            },
        )
    }

    fn kinds(alerts: &[Alert]) -> Vec<(AlertType, u8)> {
        alerts.iter().map(|a| (a.kind, a.priority)).collect()
    }

    #[test]
    fn dry_soil_is_single_critical() {
        let engine = AlertEngine::default();
        let seed = PlantProfile::seed();
        let alerts = engine.evaluate(&reading(35.0, 22.0, 300.0, 100.0), Some(&seed));
        assert_eq!(kinds(&alerts), vec![(AlertType::Critical, 3)]);
        assert!(alerts[0].message.contains("needs watering"));
        assert!(alerts[0].message.contains("35%"));
    }

    #[test]
    fn low_battery_is_single_warning() {
        let engine = AlertEngine::default();
        let seed = PlantProfile::seed();
        let alerts = engine.evaluate(&reading(50.0, 22.0, 300.0, 15.0), Some(&seed));
        assert_eq!(kinds(&alerts), vec![(AlertType::Warning, 2)]);
        assert!(alerts[0].message.contains("Low battery"));
    }

    #[test]
    fn in_range_raises_nothing() {
        let engine = AlertEngine::default();
        let seed = PlantProfile::seed();
        let alerts = engine.evaluate(&reading(50.0, 22.0, 300.0, 100.0), Some(&seed));
        assert!(alerts.is_empty());
        assert!(engine.is_empty());
    }

    #[test]
    fn one_reading_can_raise_several() {
        let found = check(&reading(70.0, 10.0, 100.0, 5.0), &PlantProfile::seed());
        let messages: Vec<_> = found.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(found.len(), 4);
        assert!(messages[0].contains("may be overwatered"));
        assert!(messages[1].starts_with("Low temperature"));
        assert!(messages[2].contains("needs more light"));
        assert!(messages[3].starts_with("Low battery"));
    }

    #[test]
    fn hot_and_bright_only_warns_on_heat() {
        let found = check(&reading(50.0, 30.0, 5000.0, 100.0), &PlantProfile::seed());
        assert_eq!(found.len(), 1);
        assert!(found[0].message.starts_with("High temperature"));
    }

    #[test]
    fn check_is_deterministic() {
        let r = reading(20.0, 40.0, 10.0, 1.0);
        let p = PlantProfile::seed();
        assert_eq!(check(&r, &p), check(&r, &p));
    }

    #[test]
    fn unknown_profile_is_skipped() {
        let engine = AlertEngine::default();
        assert!(engine.evaluate(&reading(0.0, 99.0, 0.0, 0.0), None).is_empty());
        assert!(engine.is_empty());
    }

    #[test]
    fn log_is_capped_and_evicts_oldest() {
        let engine = AlertEngine::default();
        let profile = PlantProfile::seed();
        let first = engine.evaluate(&reading(50.0, 22.0, 300.0, 10.0), Some(&profile));
        assert!(engine.resolve(first[0].id));
        let mut all = first.clone();
        for _ in 0..DEFAULT_ALERT_CAPACITY {
            all.extend(engine.evaluate(&reading(50.0, 22.0, 300.0, 10.0), Some(&profile)));
            assert!(engine.len() <= DEFAULT_ALERT_CAPACITY);
        }
        assert_eq!(engine.len(), DEFAULT_ALERT_CAPACITY);
        let kept: Vec<_> = engine.log().iter().map(|a| a.id).collect();
        let expected: Vec<_> = all[1..].iter().map(|a| a.id).collect();
        assert_eq!(kept, expected);
        assert!(!engine.resolve(first[0].id), "evicted alert cannot be resolved");
    }

    #[test]
    fn resolve_is_idempotent() {
        let engine = AlertEngine::default();
        let a = engine.evaluate(&reading(10.0, 22.0, 300.0, 100.0), Some(&PlantProfile::seed()));
        assert!(engine.resolve(a[0].id));
        assert!(engine.resolve(a[0].id));
        assert!(engine.log()[0].resolved);
        assert!(engine.active(None).is_empty());
    }

    #[test]
    fn resolving_unknown_changes_nothing() {
        let engine = AlertEngine::default();
        engine.evaluate(&reading(10.0, 22.0, 300.0, 100.0), Some(&PlantProfile::seed()));
        let before = engine.log();
        assert!(!engine.resolve(Uuid::new_v4()));
        assert_eq!(engine.log(), before);
    }

    #[test]
    fn active_sorts_by_priority_descending() {
        let engine = AlertEngine::default();
        let p = PlantProfile::seed();
        engine.evaluate(&reading(50.0, 22.0, 100.0, 100.0), Some(&p)); // info, 1
        engine.evaluate(&reading(10.0, 22.0, 300.0, 100.0), Some(&p)); // critical, 3
        engine.evaluate(&reading(50.0, 30.0, 300.0, 100.0), Some(&p)); // warning, 2
        let order: Vec<_> = engine.active(None).iter().map(|a| a.priority).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn active_filters_by_plant() {
        let engine = AlertEngine::default();
        let p = PlantProfile::seed();
        let mut other = reading(10.0, 22.0, 300.0, 100.0);
        other.plant_id = "plant-2".into();
        engine.evaluate(&other, Some(&p));
        engine.evaluate(&reading(10.0, 22.0, 300.0, 100.0), Some(&p));
        assert_eq!(engine.active(Some("plant-2")).len(), 1);
        assert_eq!(engine.active(Some("plant-1")).len(), 1);
        assert_eq!(engine.active(None).len(), 2);
    }
}
