//! Axum HTTP handlers for the monitor service.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use plant_core::monitor::DEFAULT_WINDOW_HOURS;
use plant_core::validate;
use plant_core::{CoreError, PlantProfile};
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    body,
    models::{
        AlertsQuery, AlertsResponse, HealthResponse, HistoryQuery, HistoryResponse, WateringRecord,
    },
    AppState,
};

// ------------------------------------------------------------------ //
//  Error mapping                                                      //
// ------------------------------------------------------------------ //

fn error_response(err: CoreError) -> Response {
    match err {
        CoreError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
        CoreError::Validation(errs) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Validation failed", "details": errs})),
        )
            .into_response(),
    }
}

fn not_found(entity: &'static str, id: &str) -> Response {
    error_response(CoreError::NotFound {
        entity,
        id: id.to_string(),
    })
}

/// Write `profile` through to PostgreSQL when configured.
///
/// The in-memory change is already applied; a failure only changes the
/// response to 500.
async fn persist(state: &AppState, profile: &PlantProfile) -> Result<(), Response> {
    let Some(store) = &state.profiles else {
        return Ok(());
    };
    store.upsert(profile).await.map_err(|e| {
        error!(error = %e, plant_id = %profile.id, "profile persist failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Failed to persist plant profile"})),
        )
            .into_response()
    })
}

// ------------------------------------------------------------------ //
//  Sensors                                                            //
// ------------------------------------------------------------------ //

/// GET /api/sensors/current/:plant_id
pub async fn current_reading(
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<String>,
) -> Response {
    match state.monitor.latest(&plant_id) {
        Some(reading) => (StatusCode::OK, Json(reading)).into_response(),
        None => not_found("sensor data for plant", &plant_id),
    }
}

/// GET /api/sensors/history/:plant_id?hours=
pub async fn reading_history(
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let hours = q
        .hours
        .as_deref()
        .and_then(|h| h.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(DEFAULT_WINDOW_HOURS);

    let history = state.monitor.history(&plant_id, hours);
    (
        StatusCode::OK,
        Json(HistoryResponse {
            count: history.readings.len(),
            readings: history.readings,
            trends: history.trend,
        }),
    )
        .into_response()
}

/// GET /api/sensors/health/:plant_id
pub async fn plant_health(
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<String>,
) -> Response {
    if state.monitor.registry.get(&plant_id).is_none() {
        return error_response(CoreError::plant_not_found(&plant_id));
    }
    match state.monitor.score(&plant_id) {
        Some(h) => (
            StatusCode::OK,
            Json(HealthResponse {
                plant_id: h.profile.id,
                plant_name: h.profile.name,
                health_score: h.score,
                last_updated: h.reading.timestamp,
            }),
        )
            .into_response(),
        None => not_found("sensor data for plant", &plant_id),
    }
}

/// POST /api/sensors/reading
///
/// Validated readings are queued to the driver, which stores them and raises
/// their alerts on its next turn.
pub async fn submit_reading(State(state): State<Arc<AppState>>, bytes: Bytes) -> Response {
    let reading = match body::reading_input(&bytes)
        .and_then(|(input, errs)| validate::reading_with(&input, errs, Utc::now()))
    {
        Ok(r) => r,
        Err(errs) => return error_response(errs.into()),
    };

    match state.ingest_tx.try_send(reading.clone()) {
        Ok(()) => {
            info!(plant_id = %reading.plant_id, "reading accepted");
            (
                StatusCode::ACCEPTED,
                Json(json!({"message": "Sensor reading accepted", "reading": reading})),
            )
                .into_response()
        }
        Err(TrySendError::Full(_)) => {
            warn!(plant_id = %reading.plant_id, "ingest queue full, rejecting reading");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "Ingest queue full, retry later"})),
            )
                .into_response()
        }
        Err(TrySendError::Closed(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Ingest is shutting down"})),
        )
            .into_response(),
    }
}

// ------------------------------------------------------------------ //
//  Plants                                                             //
// ------------------------------------------------------------------ //

/// GET /api/plants
pub async fn list_plants(State(state): State<Arc<AppState>>) -> Response {
    (StatusCode::OK, Json(state.monitor.registry.all())).into_response()
}

/// GET /api/plants/:plant_id
pub async fn get_plant(
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<String>,
) -> Response {
    match state.monitor.registry.get(&plant_id) {
        Some(p) => (StatusCode::OK, Json(p)).into_response(),
        None => error_response(CoreError::plant_not_found(&plant_id)),
    }
}

/// POST /api/plants
pub async fn create_plant(State(state): State<Arc<AppState>>, bytes: Bytes) -> Response {
    let profile = match body::profile_input(&bytes)
        .and_then(|(input, errs)| validate::profile_with(&input, errs, Utc::now()))
    {
        Ok(p) => p,
        Err(errs) => return error_response(errs.into()),
    };
    if state.monitor.registry.get(&profile.id).is_some() {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": format!("plant already exists: {}", profile.id)})),
        )
            .into_response();
    }

    state.monitor.registry.register(profile.clone());
    if let Err(resp) = persist(&state, &profile).await {
        return resp;
    }
    info!(plant_id = %profile.id, "plant registered");
    (
        StatusCode::CREATED,
        Json(json!({"message": "Plant profile created successfully", "plant": profile})),
    )
        .into_response()
}

/// PUT /api/plants/:plant_id
pub async fn update_plant(
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<String>,
    bytes: Bytes,
) -> Response {
    let update = match body::profile_update(&bytes).and_then(|(update, errs)| {
        validate::profile_update_with(&update, errs)?;
        Ok(update)
    }) {
        Ok(u) => u,
        Err(errs) => return error_response(errs.into()),
    };
    let Some(profile) = state.monitor.registry.update(&plant_id, &update) else {
        return error_response(CoreError::plant_not_found(&plant_id));
    };
    if let Err(resp) = persist(&state, &profile).await {
        return resp;
    }
    info!(plant_id = %plant_id, "plant updated");
    (
        StatusCode::OK,
        Json(json!({"message": "Plant profile updated successfully", "plant": profile})),
    )
        .into_response()
}

/// POST /api/plants/:plant_id/water
pub async fn water_plant(
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<String>,
    bytes: Bytes,
) -> Response {
    let req = match body::water_request(&bytes) {
        Ok(r) => r,
        Err(errs) => return error_response(errs.into()),
    };
    let now = Utc::now();
    let Some(profile) = state.monitor.registry.record_watering(&plant_id, now) else {
        return error_response(CoreError::plant_not_found(&plant_id));
    };
    if let Err(resp) = persist(&state, &profile).await {
        return resp;
    }

    let record = WateringRecord {
        plant_id: profile.id,
        timestamp: now,
        amount: req.amount.unwrap_or_else(|| json!("unknown")),
        notes: req.notes.unwrap_or_default(),
        recorded_by: "user".to_string(),
    };
    info!(plant_id = %plant_id, "watering recorded");
    (
        StatusCode::OK,
        Json(json!({"message": "Watering recorded successfully", "record": record})),
    )
        .into_response()
}

// ------------------------------------------------------------------ //
//  Alerts                                                             //
// ------------------------------------------------------------------ //

/// GET /api/alerts?plantId=
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AlertsQuery>,
) -> Response {
    let alerts = state.monitor.active_alerts(q.plant_id.as_deref());
    let count = alerts.len();
    (StatusCode::OK, Json(AlertsResponse { alerts, count })).into_response()
}

/// POST /api/alerts/:alert_id/resolve
pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> Response {
    let resolved = Uuid::parse_str(&alert_id)
        .map(|id| state.monitor.resolve(id))
        .unwrap_or(false);
    if !resolved {
        return not_found("alert", &alert_id);
    }
    info!(alert_id = %alert_id, "alert resolved");
    (
        StatusCode::OK,
        Json(json!({"message": "Alert resolved successfully"})),
    )
        .into_response()
}

// ------------------------------------------------------------------ //
//  Health                                                             //
// ------------------------------------------------------------------ //

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
