//! Service configuration, read once from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use plant_core::alerts::DEFAULT_ALERT_CAPACITY;
use plant_core::broadcast::DEFAULT_SUBSCRIBER_BUFFER;
use plant_core::store::DEFAULT_READING_CAPACITY;
use plant_core::RetentionPolicy;
use tracing::info;

/// InfluxDB connection settings; present only when all four variables are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    pub token: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionMode {
    Global,
    PerPlant,
}

impl FromStr for RetentionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(RetentionMode::Global),
            "per-plant" | "per_plant" | "perplant" => Ok(RetentionMode::PerPlant),
            other => Err(anyhow!("unknown retention mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub tick_interval: Duration,
    pub reading_capacity: usize,
    pub alert_capacity: usize,
    pub retention_mode: RetentionMode,
    pub subscriber_buffer: usize,
    pub ingest_queue: usize,
    pub simulate: bool,
    pub database_url: Option<String>,
    pub influx: Option<InfluxConfig>,
    pub amqp_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let tick_ms: u64 = parse(&var, "TICK_INTERVAL_MS", 3000)?;
        if tick_ms == 0 {
            return Err(anyhow!("TICK_INTERVAL_MS must be greater than zero"));
        }

        let influx = match (
            var("INFLUXDB_URL"),
            var("INFLUXDB_ORG"),
            var("INFLUXDB_TOKEN"),
            var("INFLUXDB_BUCKET"),
        ) {
            (Some(url), Some(org), Some(token), Some(bucket)) => Some(InfluxConfig {
                url,
                org,
                token,
                bucket,
            }),
            _ => None,
        };

        Ok(Self {
            addr: var("MONITOR_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            tick_interval: Duration::from_millis(tick_ms),
            reading_capacity: parse(&var, "READING_CAPACITY", DEFAULT_READING_CAPACITY)?,
            alert_capacity: parse(&var, "ALERT_CAPACITY", DEFAULT_ALERT_CAPACITY)?,
            retention_mode: parse(&var, "RETENTION_MODE", RetentionMode::Global)?,
            subscriber_buffer: parse(&var, "SUBSCRIBER_BUFFER", DEFAULT_SUBSCRIBER_BUFFER)?,
            ingest_queue: parse(&var, "INGEST_QUEUE", 256)?,
            simulate: match var("SIMULATE") {
                Some(v) => parse_bool(&v).context("Invalid SIMULATE")?,
                None => true,
            },
            database_url: var("DATABASE_URL"),
            influx,
            amqp_url: var("AMQP_URL"),
        })
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        match self.retention_mode {
            RetentionMode::Global => RetentionPolicy::Global(self.reading_capacity),
            RetentionMode::PerPlant => RetentionPolicy::PerPlant(self.reading_capacity),
        }
    }

    /// Log the effective settings. Credentials are never printed.
    pub fn log(&self) {
        info!(
            addr = %self.addr,
            tick_ms = self.tick_interval.as_millis() as u64,
            reading_capacity = self.reading_capacity,
            alert_capacity = self.alert_capacity,
            retention = ?self.retention_mode,
            subscriber_buffer = self.subscriber_buffer,
            ingest_queue = self.ingest_queue,
            simulate = self.simulate,
            postgres = self.database_url.is_some(),
            influxdb = self.influx.is_some(),
            amqp = self.amqp_url.is_some(),
            "configuration loaded"
        );
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key}='{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}
