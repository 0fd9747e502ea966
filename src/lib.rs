// src/lib.rs

use std::sync::Arc;
use std::time::Duration;

use services::{broadcast_hub::BroadcastHub, channel_client::ChannelClient, listener_health::ListenerHealth};
use store::PlanStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlanStore>,
    pub hub: BroadcastHub,
    pub channel: Arc<dyn ChannelClient>,
    pub listener: ListenerHealth,
    /// Idle interval after which SSE streams emit a keep-alive comment
    pub stream_heartbeat: Duration,
}

pub mod entities {
    pub mod prelude;
    pub mod trading_plans;
}

pub mod services {
    pub mod broadcast_hub;
    pub mod channel_client;
    pub mod history;
    pub mod ingestion;
    pub mod listener_health;
    pub mod parser;
    pub mod telegram;
}

pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
