//! Plant monitor service.
//!
//! Runs the ingest driver (simulated readings every tick plus readings
//! submitted over HTTP), serves the query API and streams each plant's
//! readings and alerts over WebSocket.
//!
//! # Configuration
//! Plain environment variables; a `.env` file is honoured.
//!
//! | Env var             | Default          |
//! |---------------------|------------------|
//! | `MONITOR_ADDR`      | `0.0.0.0:5000`   |
//! | `TICK_INTERVAL_MS`  | `3000`           |
//! | `READING_CAPACITY`  | `100`            |
//! | `ALERT_CAPACITY`    | `50`             |
//! | `RETENTION_MODE`    | `global`         |
//! | `SUBSCRIBER_BUFFER` | `64`             |
//! | `INGEST_QUEUE`      | `256`            |
//! | `SIMULATE`          | `true`           |
//! | `DATABASE_URL`      | *(optional)*     |
//! | `INFLUXDB_URL`      | *(optional)*     |
//! | `INFLUXDB_ORG`      | *(optional)*     |
//! | `INFLUXDB_TOKEN`    | *(optional)*     |
//! | `INFLUXDB_BUCKET`   | *(optional)*     |
//! | `AMQP_URL`          | *(optional)*     |

use std::sync::Arc;

use anyhow::{Context, Result};
use plant_core::{
    AlertEngine, Broadcaster, FanOut, PlantMonitor, PlantProfile, PlantRegistry, ReadingStore,
    TopicHub,
};
use plant_monitor::{
    config::Config,
    driver::Driver,
    profiles::PgProfileStore,
    relay::AmqpRelay,
    router,
    simulator::Simulator,
    sink::InfluxTelemetrySink,
    AppState,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plant_monitor=info".parse()?)
                .add_directive("plant_core=info".parse()?),
        )
        .json()
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    config.log();

    // ── Profiles (PostgreSQL when configured, built-in seed otherwise) ───
    let (profiles, seed) = match &config.database_url {
        Some(url) => {
            let store = PgProfileStore::connect(url).await?;
            store.migrate().await?;
            let mut stored = store.load_all().await?;
            if stored.is_empty() {
                let seed = PlantProfile::seed();
                store.upsert(&seed).await?;
                stored.push(seed);
            }
            info!(plants = stored.len(), "profiles loaded from PostgreSQL");
            (Some(store), stored)
        }
        None => (None, vec![PlantProfile::seed()]),
    };

    let monitor = Arc::new(PlantMonitor::new(
        ReadingStore::new(config.retention_policy()),
        AlertEngine::new(config.alert_capacity),
        PlantRegistry::new(seed),
    ));
    let hub = Arc::new(TopicHub::new(config.subscriber_buffer));

    // ── Broadcast targets ────────────────────────────────────────────────
    let mut fan_out = FanOut::new().with(hub.clone());
    let mut relay_task = None;
    if let Some(url) = &config.amqp_url {
        match AmqpRelay::connect(url, config.ingest_queue).await {
            Ok((relay, handle)) => {
                fan_out = fan_out.with(Arc::new(relay));
                relay_task = Some(handle);
            }
            Err(e) => warn!(error = %e, "AMQP relay unavailable, continuing without it"),
        }
    }
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(fan_out);

    // ── Driver ───────────────────────────────────────────────────────────
    let mut driver = Driver::new(monitor.clone(), broadcaster, config.tick_interval);
    if let Some(influx) = &config.influx {
        driver = driver.with_sink(Arc::new(InfluxTelemetrySink::new(
            &influx.url,
            &influx.org,
            &influx.token,
            &influx.bucket,
        )));
        info!(bucket = %influx.bucket, "InfluxDB telemetry mirror enabled");
    }
    if config.simulate {
        driver = driver.with_simulator(Simulator::new());
    }

    let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest_queue.max(1));
    let cancel = CancellationToken::new();
    let driver_task = tokio::spawn(driver.run(ingest_rx, cancel.clone()));

    // ── HTTP ─────────────────────────────────────────────────────────────
    let state = Arc::new(AppState {
        monitor,
        hub,
        ingest_tx,
        profiles,
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    info!(addr = %config.addr, "plant monitor listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    // The server may also stop on its own; make sure the driver follows.
    cancel.cancel();
    if let Err(e) = driver_task.await {
        error!(error = %e, "driver task panicked");
    }
    if let Some(handle) = relay_task {
        // The relay drains once the driver has dropped its sender.
        if let Err(e) = handle.await {
            error!(error = %e, "AMQP relay task panicked");
        }
    }

    info!("plant monitor stopped");
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
