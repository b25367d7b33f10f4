//! Plant monitor service: HTTP query API, WebSocket streams and the ingest
//! driver around `plant-core`.

pub mod body;
pub mod config;
pub mod driver;
pub mod handlers;
pub mod models;
pub mod profiles;
pub mod relay;
pub mod simulator;
pub mod sink;
pub mod ws;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use plant_core::{PlantMonitor, SensorReading, TopicHub};
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::profiles::PgProfileStore;

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    pub monitor: Arc<PlantMonitor>,
    /// Local subscribers; WebSocket clients attach here.
    pub hub: Arc<TopicHub>,
    /// Submitted readings, consumed by the driver.
    pub ingest_tx: mpsc::Sender<SensorReading>,
    /// Write-through for registry changes, when PostgreSQL is configured.
    pub profiles: Option<PgProfileStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Sensors
        .route("/api/sensors/current/:plant_id", get(handlers::current_reading))
        .route("/api/sensors/history/:plant_id", get(handlers::reading_history))
        .route("/api/sensors/health/:plant_id", get(handlers::plant_health))
        .route("/api/sensors/reading", post(handlers::submit_reading))
        // Plants
        .route("/api/plants", get(handlers::list_plants).post(handlers::create_plant))
        .route(
            "/api/plants/:plant_id",
            get(handlers::get_plant).put(handlers::update_plant),
        )
        .route("/api/plants/:plant_id/water", post(handlers::water_plant))
        // Alerts
        .route("/api/alerts", get(handlers::list_alerts))
        .route("/api/alerts/:alert_id/resolve", post(handlers::resolve_alert))
        // Real-time
        .route("/ws/plants/:plant_id", get(ws::plant_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
