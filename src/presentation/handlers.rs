// HTTP request handlers
use crate::infrastructure::json_mapper::snapshot_to_json;
use crate::presentation::app_state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest published snapshot as JSON. 503 until the first cycle completes.
pub async fn get_bms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    match snapshot {
        Some(snapshot) => Json(snapshot_to_json(&snapshot)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "no measurement cycle has completed yet",
        )
            .into_response(),
    }
}

/// Plain-text service report, in the spirit of a serial debug dump.
pub async fn system_info(State(state): State<Arc<AppState>>) -> String {
    let uptime = state.started.elapsed().as_secs();
    let mut info = format!("BMS Telemetry Service\nUptime: {uptime}s\n");

    if let Some(snapshot) = state.snapshot_rx.borrow().clone() {
        info.push_str(&format!(
            "SOC: {:.1}%\nSOH: {:.1}%\nStatus: {}\nActive alerts: {}\n",
            snapshot.soc,
            snapshot.soh,
            snapshot.charging.as_str(),
            snapshot.alerts.len()
        ));
    } else {
        info.push_str("No measurement cycle completed yet\n");
    }

    info
}
