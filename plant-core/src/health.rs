//! Weighted health scoring and care recommendations.

use serde::{Deserialize, Serialize};

use crate::model::{PlantProfile, Range, SensorReading};

const MOISTURE_WEIGHT: f64 = 0.4;
const TEMPERATURE_WEIGHT: f64 = 0.3;
const LIGHT_WEIGHT: f64 = 0.2;
const PH_WEIGHT: f64 = 0.1;

/// Factor score below which a recommendation is emitted.
const ADVISORY_THRESHOLD: f64 = 70.0;

pub const WATER_NOW: &str = "Water your plant - soil moisture is below optimal range";
pub const MONITOR_MOISTURE: &str = "Monitor soil moisture closely - approaching dry conditions";
pub const MOVE_COOLER: &str = "Move plant to cooler location or increase ventilation";
pub const MOVE_WARMER: &str = "Consider moving plant to warmer location";
pub const MORE_LIGHT: &str = "Increase light exposure - consider moving closer to window";
pub const CHECK_PH: &str = "Check soil pH levels - may need soil amendment";
pub const ALL_OPTIMAL: &str = "Plant conditions are optimal - continue current care routine";

/// Per-metric closeness to the optimal range, each 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    pub moisture: f64,
    pub temperature: f64,
    pub light: f64,
    pub ph: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// Weighted overall score, 0–100.
    pub overall: u8,
    pub factors: Factors,
    pub recommendations: Vec<String>,
}

/// Normalise `value` against `range` into 0–100.
///
/// Inside the range scores 100; outside, the score drops by the relative
/// deviation from the nearest bound. A zero bound on the violated side has no
/// relative scale and scores 0.
pub fn factor_score(value: f64, range: Range) -> f64 {
    if range.contains(value) {
        return 100.0;
    }
    let (gap, bound) = if value < range.min {
        (range.min - value, range.min)
    } else {
        (value - range.max, range.max)
    };
    if bound == 0.0 {
        return 0.0;
    }
    let deviation = gap / bound.abs();
    (100.0 - deviation * 100.0).clamp(0.0, 100.0)
}

/// Score `reading` against `profile`.
pub fn score(reading: &SensorReading, profile: &PlantProfile) -> HealthScore {
    let ranges = &profile.optimal_ranges;
    let factors = Factors {
        moisture: factor_score(reading.soil_moisture, ranges.soil_moisture),
        temperature: factor_score(reading.temperature, ranges.temperature),
        light: factor_score(reading.light_level, ranges.light_level),
        ph: factor_score(reading.ph, ranges.ph),
    };

    let weighted = factors.moisture * MOISTURE_WEIGHT
        + factors.temperature * TEMPERATURE_WEIGHT
        + factors.light * LIGHT_WEIGHT
        + factors.ph * PH_WEIGHT;

    HealthScore {
        overall: weighted.round().clamp(0.0, 100.0) as u8,
        factors,
        recommendations: recommendations(&factors, reading, profile),
    }
}

fn recommendations(
    factors: &Factors,
    reading: &SensorReading,
    profile: &PlantProfile,
) -> Vec<String> {
    let ranges = &profile.optimal_ranges;
    let mut out = Vec::new();

    if factors.moisture < ADVISORY_THRESHOLD {
        if reading.soil_moisture < ranges.soil_moisture.min {
            out.push(WATER_NOW);
        } else {
            out.push(MONITOR_MOISTURE);
        }
    }
    if factors.temperature < ADVISORY_THRESHOLD {
        if reading.temperature > ranges.temperature.max {
            out.push(MOVE_COOLER);
        } else {
            out.push(MOVE_WARMER);
        }
    }
    // Light has no upper-bound complaint; too bright still reads as "more light".
    if factors.light < ADVISORY_THRESHOLD {
        out.push(MORE_LIGHT);
    }
    if factors.ph < ADVISORY_THRESHOLD {
        out.push(CHECK_PH);
    }
    if out.is_empty() {
        out.push(ALL_OPTIMAL);
    }

    out.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metrics;
    use chrono::Utc;

    fn reading(soil_moisture: f64, temperature: f64, light_level: f64, ph: f64) -> SensorReading {
        SensorReading::new(
            "plant-1",
            Utc::now(),
            Metrics {
                soil_moisture,
                temperature,
                light_level,
                ph,
                humidity: 50.0,
                battery_level: 100.0,
            },
        )
    }

    #[test]
    fn bounds_score_full() {
        let r = Range::new(40.0, 60.0);
        assert_eq!(factor_score(40.0, r), 100.0);
        assert_eq!(factor_score(60.0, r), 100.0);
    }

    #[test]
    fn double_the_max_scores_zero() {
        assert_eq!(factor_score(120.0, Range::new(40.0, 60.0)), 0.0);
        assert_eq!(factor_score(500.0, Range::new(40.0, 60.0)), 0.0);
    }

    #[test]
    fn relative_deviation_below_min() {
        // 10% under a min of 40
        assert!((factor_score(36.0, Range::new(40.0, 60.0)) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn zero_floor_with_negative_value_scores_zero() {
        assert_eq!(factor_score(-1.0, Range::new(0.0, 10.0)), 0.0);
    }

    #[test]
    fn negative_min_uses_magnitude() {
        // 5 below a min of -10 is a 50% deviation
        assert!((factor_score(-15.0, Range::new(-10.0, 5.0)) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn all_in_range_is_optimal() {
        let hs = score(&reading(50.0, 22.0, 300.0, 6.5), &PlantProfile::seed());
        assert_eq!(hs.overall, 100);
        assert_eq!(hs.recommendations, vec![ALL_OPTIMAL.to_string()]);
    }

    #[test]
    fn weights_combine_factors() {
        // moisture 0, everything else perfect: 0.3*100 + 0.2*100 + 0.1*100
        let hs = score(&reading(0.0, 22.0, 300.0, 6.5), &PlantProfile::seed());
        assert_eq!(hs.factors.moisture, 0.0);
        assert_eq!(hs.overall, 60);
        assert_eq!(hs.recommendations, vec![WATER_NOW.to_string()]);
    }

    #[test]
    fn recommendations_are_independent_and_ordered() {
        // dry, hot, dark, acidic
        let hs = score(&reading(10.0, 40.0, 50.0, 3.0), &PlantProfile::seed());
        assert_eq!(
            hs.recommendations,
            vec![WATER_NOW, MOVE_COOLER, MORE_LIGHT, CHECK_PH]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn over_wet_gets_monitor_advisory() {
        // 100 against max 60: deviation 0.667, factor 33
        let hs = score(&reading(100.0, 22.0, 300.0, 6.5), &PlantProfile::seed());
        assert_eq!(hs.recommendations, vec![MONITOR_MOISTURE.to_string()]);
    }

    #[test]
    fn cold_gets_warmer_advice() {
        let hs = score(&reading(50.0, 5.0, 300.0, 6.5), &PlantProfile::seed());
        assert_eq!(hs.recommendations, vec![MOVE_WARMER.to_string()]);
    }

    #[test]
    fn far_too_bright_still_asks_for_light() {
        let hs = score(&reading(50.0, 22.0, 900.0, 6.5), &PlantProfile::seed());
        assert_eq!(hs.recommendations, vec![MORE_LIGHT.to_string()]);
    }
}
