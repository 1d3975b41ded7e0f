use axum::{body::Bytes, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
    /// Size of the request body, so POSTs show up as inbound bandwidth
    pub received_bytes: usize,
}

// ─── GET|POST /api/test ──────────────────────────────────────────
/// Cheap endpoint for generating traffic against the monitor itself.

pub async fn probe(body: Bytes) -> Json<ProbeResponse> {
    Json(ProbeResponse {
        message: "Test endpoint - generating traffic",
        timestamp: Utc::now(),
        status: "success",
        received_bytes: body.len(),
    })
}
