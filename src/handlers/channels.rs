use axum::{extract::State, http::StatusCode, Json};
use tracing::error;

use crate::models::trading_plan::{ChannelsResponse, ErrorResponse};
use crate::AppState;

/// GET /channels - channels visible to the Telegram client
pub async fn get_channels(
    State(state): State<AppState>,
) -> Result<Json<ChannelsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let channels = state.channel.list_channels().await.map_err(|e| {
        error!(error = %e, "Failed to list channels");
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: format!("Channel error: {}", e),
                code: Some("CHANNEL_ERROR".to_string()),
            }),
        )
    })?;

    Ok(Json(ChannelsResponse { channels }))
}
