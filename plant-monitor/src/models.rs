//! HTTP request/response models for the monitor's REST API.
//!
//! Request bodies for readings and profiles reuse the validated inputs from
//! `plant_core::validate`.

use chrono::{DateTime, Utc};
use plant_core::{Alert, HealthScore, SensorReading, Trend};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------ //
//  Inbound (client → monitor)                                         //
// ------------------------------------------------------------------ //

/// Query string of `GET /api/sensors/history/:plant_id`.
///
/// `hours` is kept raw: anything missing, unparsable or non-positive falls
/// back to the default window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<String>,
}

/// Query string of `GET /api/alerts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsQuery {
    pub plant_id: Option<String>,
}

/// Body of `POST /api/plants/:plant_id/water`. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaterRequest {
    pub amount: Option<serde_json::Value>,
    pub notes: Option<String>,
}

// ------------------------------------------------------------------ //
//  Outbound (monitor → client)                                        //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub readings: Vec<SensorReading>,
    /// `None` with fewer than two readings in the window.
    pub trends: Option<Trend>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub plant_id: String,
    pub plant_name: String,
    pub health_score: HealthScore,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

/// What `POST /api/plants/:plant_id/water` hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringRecord {
    pub plant_id: String,
    pub timestamp: DateTime<Utc>,
    pub amount: serde_json::Value,
    pub notes: String,
    pub recorded_by: String,
}
