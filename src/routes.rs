use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::{alert, channels, health, history};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello_tradeplan))
        .route("/alert", get(alert::alert))
        .route("/alert/{stock_name}", get(alert::alert_by_stock))
        .route("/history", get(history::get_history))
        .route("/history/today", get(history::get_history_today))
        .route("/channels", get(channels::get_channels))
        .route("/health", get(health::get_health))
        .with_state(state)
}

/// Router with CORS and request tracing, as served by the binary
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    router(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

async fn hello_tradeplan() -> &'static str {
    "Hello from Trading Plan Backend! 📈"
}

/// CORS for the configured browser origins.
///
/// Credentials are allowed, so methods and headers mirror the request
/// instead of using wildcards. Unparseable origins are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    info!("CORS configured with {} allowed origins", origins.len());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
