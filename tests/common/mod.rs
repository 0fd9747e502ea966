use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDateTime;
use tradeplan_backend::models::trading_plan::{ChannelInfo, TradingPlan};
use tradeplan_backend::routes;
use tradeplan_backend::services::broadcast_hub::BroadcastHub;
use tradeplan_backend::services::channel_client::{ChannelClient, ChannelError, ChannelMessage};
use tradeplan_backend::services::listener_health::ListenerHealth;
use tradeplan_backend::store::{ingest, MemoryPlanStore};
use tradeplan_backend::AppState;

/// Channel client that never delivers messages
pub struct StaticChannel {
    pub channels: Option<Vec<ChannelInfo>>,
}

#[async_trait]
impl ChannelClient for StaticChannel {
    async fn connect(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn get_recent_messages(&self, _limit: usize) -> Result<Vec<ChannelMessage>, ChannelError> {
        Ok(Vec::new())
    }

    async fn next_messages(&self) -> Result<Vec<ChannelMessage>, ChannelError> {
        Ok(Vec::new())
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ChannelError> {
        self.channels.clone().ok_or(ChannelError::NotConnected)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryPlanStore>,
    pub hub: BroadcastHub,
    #[allow(dead_code)]
    pub listener: ListenerHealth,
}

/// Router backed by an in-memory store and a static channel
pub fn build_test_app(channels: Option<Vec<ChannelInfo>>) -> TestApp {
    let store = Arc::new(MemoryPlanStore::new());
    let hub = BroadcastHub::new();
    let listener = ListenerHealth::new();

    let state = AppState {
        store: store.clone(),
        hub: hub.clone(),
        channel: Arc::new(StaticChannel { channels }),
        listener: listener.clone(),
        stream_heartbeat: Duration::from_secs(30),
    };

    TestApp {
        router: routes::router(state),
        store,
        hub,
        listener,
    }
}

pub fn plan(message_id: i64, name: &str, timestamp: NaiveDateTime) -> TradingPlan {
    TradingPlan {
        message_id,
        timestamp,
        symbol_name: name.to_string(),
        buy_levels: vec![9000, 9050],
        take_profit_levels: vec![9200, 9300],
        stop_loss: 8900,
    }
}

#[allow(dead_code)]
pub async fn seed(store: &MemoryPlanStore, plans: &[TradingPlan]) {
    for plan in plans {
        ingest(store, plan).await.expect("seed plan");
    }
}
