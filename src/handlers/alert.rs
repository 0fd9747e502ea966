//! Server-Sent Events streams of newly stored trading plans
//!
//! GET /alert and GET /alert/{stock_name}
//!
//! Frames:
//! - `: connected` once the subscriber is registered
//! - `data: <plan json>` per stored plan
//! - `: keep-alive` after each heartbeat interval without data, so proxies
//!   keep the connection open and clients can detect liveness
//!
//! The subscription lives inside the response stream. When the client goes
//! away axum drops the stream, which unregisters the subscriber.

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures_util::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::services::broadcast_hub::Subscription;
use crate::AppState;

/// GET /alert - every stored trading plan
pub async fn alert(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe();
    info!(subscriber_id = subscription.id(), "Alert stream opened");

    Sse::new(plan_events(subscription, None, state.stream_heartbeat))
}

/// GET /alert/{stock_name} - trading plans for one symbol (case-insensitive)
pub async fn alert_by_stock(
    State(state): State<AppState>,
    Path(stock_name): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe();
    info!(
        subscriber_id = subscription.id(),
        stock_name = %stock_name,
        "Filtered alert stream opened"
    );

    Sse::new(plan_events(subscription, Some(stock_name), state.stream_heartbeat))
}

struct StreamState {
    subscription: Subscription,
    symbol: Option<String>,
    heartbeat: Duration,
}

/// Event stream for one subscriber: a connected comment, then plans and heartbeats
pub fn plan_events(
    subscription: Subscription,
    symbol: Option<String>,
    heartbeat: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let connected = stream::once(async { Ok(Event::default().comment("connected")) });

    let state = StreamState {
        subscription,
        symbol,
        heartbeat,
    };
    let updates = stream::unfold(state, |mut state| async move {
        let event = next_event(&mut state).await?;
        Some((Ok(event), state))
    });

    connected.chain(updates)
}

async fn next_event(state: &mut StreamState) -> Option<Event> {
    // Plans filtered out for this stream do not postpone the heartbeat
    let deadline = Instant::now() + state.heartbeat;

    loop {
        let plan = match timeout_at(deadline, state.subscription.recv()).await {
            Err(_) => return Some(Event::default().comment("keep-alive")),
            Ok(None) => return None,
            Ok(Some(plan)) => plan,
        };

        if let Some(symbol) = &state.symbol {
            if !plan.matches_symbol(symbol) {
                continue;
            }
        }

        match Event::default().json_data(plan.as_ref()) {
            Ok(event) => return Some(event),
            Err(e) => {
                warn!(
                    message_id = plan.message_id,
                    error = %e,
                    "Failed to encode trading plan event, skipping"
                );
            }
        }
    }
}
