//! Optional time-series mirror of every ingested reading.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use plant_core::SensorReading;

/// Measurement every reading is written under.
pub const MEASUREMENT: &str = "plant_telemetry";

// ------------------------------------------------------------------ //
//  Domain types                                                       //
// ------------------------------------------------------------------ //

/// One reading flattened for a time-series store.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPoint {
    pub measurement: String,
    /// Tag key → value. Ordered so the line protocol is stable.
    pub tags: BTreeMap<String, String>,
    /// Field key → value.
    pub fields: BTreeMap<String, f64>,
    /// Unix nanoseconds timestamp.
    pub timestamp_ns: i64,
}

impl From<&SensorReading> for TelemetryPoint {
    fn from(r: &SensorReading) -> Self {
        let tags = BTreeMap::from([("plant_id".to_string(), r.plant_id.clone())]);
        let fields = BTreeMap::from([
            ("soil_moisture".to_string(), r.soil_moisture),
            ("temperature".to_string(), r.temperature),
            ("light_level".to_string(), r.light_level),
            ("ph".to_string(), r.ph),
            ("humidity".to_string(), r.humidity),
            ("battery_level".to_string(), r.battery_level),
        ]);
        Self {
            measurement: MEASUREMENT.to_string(),
            tags,
            fields,
            timestamp_ns: r.timestamp.timestamp_nanos_opt().unwrap_or(0),
        }
    }
}

fn escape_lp(s: &str) -> String {
    s.replace(' ', "\\ ").replace(',', "\\,").replace('=', "\\=")
}

impl TelemetryPoint {
    /// Render as one InfluxDB line-protocol line. A zero timestamp is left
    /// for the server to assign.
    pub fn to_line_protocol(&self) -> String {
        let tags: String = self
            .tags
            .iter()
            .map(|(k, v)| format!(",{}={}", escape_lp(k), escape_lp(v)))
            .collect();
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={v}", escape_lp(k)))
            .collect::<Vec<_>>()
            .join(",");
        if self.timestamp_ns != 0 {
            format!("{}{tags} {fields} {}", escape_lp(&self.measurement), self.timestamp_ns)
        } else {
            format!("{}{tags} {fields}", escape_lp(&self.measurement))
        }
    }
}

// ------------------------------------------------------------------ //
//  Trait                                                              //
// ------------------------------------------------------------------ //

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn write_points(&self, points: Vec<TelemetryPoint>) -> Result<()>;
}

// ------------------------------------------------------------------ //
//  FakeTelemetrySink (for tests)                                      //
// ------------------------------------------------------------------ //

/// In-memory sink that collects written points for test assertions.
#[derive(Debug, Default, Clone)]
pub struct FakeTelemetrySink {
    pub points: Arc<Mutex<Vec<TelemetryPoint>>>,
}

impl FakeTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<TelemetryPoint> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl TelemetrySink for FakeTelemetrySink {
    async fn write_points(&self, points: Vec<TelemetryPoint>) -> Result<()> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(points);
        Ok(())
    }
}

// ------------------------------------------------------------------ //
//  InfluxTelemetrySink (production)                                   //
// ------------------------------------------------------------------ //

/// Writes to InfluxDB 2.x via the `influxdb2` client.
pub struct InfluxTelemetrySink {
    client: influxdb2::Client,
    org: String,
    bucket: String,
}

impl InfluxTelemetrySink {
    pub fn new(url: &str, org: &str, token: &str, bucket: &str) -> Self {
        Self {
            client: influxdb2::Client::new(url, org, token),
            org: org.to_string(),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl TelemetrySink for InfluxTelemetrySink {
    async fn write_points(&self, points: Vec<TelemetryPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let data = points
            .iter()
            .map(TelemetryPoint::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");
        self.client
            .write_line_protocol(&self.org, &self.bucket, data)
            .await
            .map_err(|e| anyhow!("InfluxDB write failed: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use plant_core::Metrics;

    fn reading(plant: &str) -> SensorReading {
        SensorReading::new(
            plant,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            Metrics {
                soil_moisture: 50.5,
                temperature: 22.0,
                light_level: 300.0,
                ph: 6.5,
                humidity: 55.0,
                battery_level: 99.9,
            },
        )
    }

    #[test]
    fn point_from_reading() {
        let p = TelemetryPoint::from(&reading("plant-1"));
        assert_eq!(p.measurement, MEASUREMENT);
        assert_eq!(p.tags["plant_id"], "plant-1");
        assert_eq!(p.fields.len(), 6);
        assert_eq!(p.fields["soil_moisture"], 50.5);
        assert_eq!(p.timestamp_ns, 1_700_000_000_000_000_000);
    }

    #[test]
    fn line_protocol_is_ordered_and_escaped() {
        let line = TelemetryPoint::from(&reading("living room,1")).to_line_protocol();
        assert_eq!(
            line,
            "plant_telemetry,plant_id=living\\ room\\,1 \
             battery_level=99.9,humidity=55,light_level=300,ph=6.5,soil_moisture=50.5,temperature=22 \
             1700000000000000000"
        );
    }

    #[test]
    fn zero_timestamp_is_omitted() {
        let mut p = TelemetryPoint::from(&reading("plant-1"));
        p.timestamp_ns = 0;
        assert!(p.to_line_protocol().ends_with("temperature=22"));
    }

    #[tokio::test]
    async fn fake_sink_collects() {
        let sink = FakeTelemetrySink::new();
        sink.write_points(vec![TelemetryPoint::from(&reading("plant-1"))])
            .await
            .unwrap();
        assert_eq!(sink.snapshot().len(), 1);
    }
}
