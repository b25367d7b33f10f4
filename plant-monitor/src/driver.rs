//! The periodic ingest loop and the only writer of the reading store.
//!
//! Each cycle stores one reading, raises its alerts, publishes the reading and
//! then the alert batch on the plant's topic, and mirrors the reading to the
//! telemetry sink. Simulated readings come from the tick; submitted readings
//! arrive on the ingest channel and go through the same cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use plant_core::{Alert, Broadcaster, Payload, PlantMonitor, SensorReading};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::simulator::Simulator;
use crate::sink::{TelemetryPoint, TelemetrySink};

pub struct Driver {
    monitor: Arc<PlantMonitor>,
    broadcaster: Arc<dyn Broadcaster>,
    sink: Option<Arc<dyn TelemetrySink>>,
    simulator: Option<Simulator>,
    interval: Duration,
}

impl Driver {
    pub fn new(
        monitor: Arc<PlantMonitor>,
        broadcaster: Arc<dyn Broadcaster>,
        interval: Duration,
    ) -> Self {
        Self {
            monitor,
            broadcaster,
            sink: None,
            simulator: None,
            interval,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = Some(simulator);
        self
    }

    /// Run one full cycle for `reading` and return the alerts it raised.
    ///
    /// Must be called from within a Tokio runtime when a sink is attached.
    pub fn cycle(&self, reading: SensorReading) -> Vec<Alert> {
        let plant_id = reading.plant_id.clone();
        let point = self.sink.as_ref().map(|_| TelemetryPoint::from(&reading));

        let alerts = self.monitor.ingest(reading.clone());
        self.broadcaster
            .publish(&plant_id, Arc::new(Payload::Reading(reading)));
        if !alerts.is_empty() {
            info!(plant_id = %plant_id, alerts = alerts.len(), "alerts raised");
            self.broadcaster
                .publish(&plant_id, Arc::new(Payload::Alerts(alerts.clone())));
        }

        if let (Some(sink), Some(point)) = (&self.sink, point) {
            let sink = Arc::clone(sink);
            tokio::spawn(async move {
                if let Err(e) = sink.write_points(vec![point]).await {
                    warn!(error = %e, "TelemetrySink write failed (non-fatal)");
                }
            });
        }

        debug!(plant_id = %plant_id, "cycle complete");
        alerts
    }

    /// Drive cycles until `cancel` fires.
    ///
    /// Cancellation is checked between cycles only; a cycle in progress always
    /// finishes.
    pub async fn run(
        mut self,
        mut ingest: mpsc::Receiver<SensorReading>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_ms = self.interval.as_millis() as u64,
            simulate = self.simulator.is_some(),
            "driver started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let simulated = self
                        .simulator
                        .as_mut()
                        .and_then(|sim| sim.next_reading(&self.monitor.registry, Utc::now()));
                    if let Some(reading) = simulated {
                        self.cycle(reading);
                    }
                }
                Some(reading) = ingest.recv() => {
                    self.cycle(reading);
                }
            }
        }

        info!("driver stopped");
    }
}
