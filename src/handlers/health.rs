use axum::{extract::State, Json};
use serde::Serialize;

use crate::services::listener_health::ListenerSnapshot;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub listener: ListenerSnapshot,
    pub subscribers: usize,
}

/// GET /health - listener state and live stream count
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        listener: state.listener.snapshot(),
        subscribers: state.hub.subscriber_count(),
    })
}
