//! Channel ingestion pipeline
//!
//! Every channel message goes through the same steps:
//!
//! 1. cheap pre-filter on the trading plan marker
//! 2. parse (rejections are dropped)
//! 3. deduplicating insert (duplicates stop here)
//! 4. publish to live subscribers
//!
//! At startup the recent channel history is backfilled oldest-first, then the
//! pipeline follows new posts one at a time in delivery order. Only one
//! listener runs per process, which keeps the store's check-then-insert free
//! of races in practice.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::broadcast_hub::BroadcastHub;
use crate::services::channel_client::{ChannelClient, ChannelError, ChannelMessage};
use crate::services::listener_health::{ListenerHealth, ListenerState};
use crate::services::parser::{parse_trading_plan, RejectionReason, TRADING_PLAN_MARKER};
use crate::store::{ingest, IngestOutcome, PlanStore, StoreError};

/// Number of recent messages fetched at startup
pub const DEFAULT_BACKFILL_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// No text, or not a trading plan at all
    Skipped,
    Rejected(RejectionReason),
    Duplicate,
    Published { delivered: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub fetched: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BackfillSummary {
    fn count(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Skipped => self.skipped += 1,
            MessageOutcome::Rejected(_) => self.rejected += 1,
            MessageOutcome::Duplicate => self.duplicates += 1,
            MessageOutcome::Published { .. } => self.stored += 1,
        }
    }
}

pub struct IngestionPipeline {
    store: Arc<dyn PlanStore>,
    hub: BroadcastHub,
    health: ListenerHealth,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn PlanStore>, hub: BroadcastHub, health: ListenerHealth) -> Self {
        Self { store, hub, health }
    }

    /// Run one message through filter, parser, store and hub
    pub async fn process_message(&self, message: &ChannelMessage) -> Result<MessageOutcome, StoreError> {
        let outcome = self.handle(message).await;
        match &outcome {
            Ok(outcome) => self
                .health
                .record_event(matches!(outcome, MessageOutcome::Published { .. })),
            Err(e) => self.health.record_error(&e.to_string()),
        }
        outcome
    }

    async fn handle(&self, message: &ChannelMessage) -> Result<MessageOutcome, StoreError> {
        let Some(text) = message.text.as_deref() else {
            return Ok(MessageOutcome::Skipped);
        };
        if !text.contains(TRADING_PLAN_MARKER) {
            return Ok(MessageOutcome::Skipped);
        }

        let plan = match parse_trading_plan(text, message.id) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(message_id = message.id, %reason, "Dropping malformed trading plan");
                return Ok(MessageOutcome::Rejected(reason));
            }
        };

        match ingest(self.store.as_ref(), &plan).await? {
            IngestOutcome::Duplicate => {
                info!(message_id = plan.message_id, "Duplicate message_id - skipping");
                Ok(MessageOutcome::Duplicate)
            }
            IngestOutcome::Stored => {
                info!(
                    message_id = plan.message_id,
                    symbol = %plan.symbol_name,
                    "Stored trading plan"
                );
                let delivered = self.hub.publish(plan);
                Ok(MessageOutcome::Published { delivered })
            }
        }
    }

    /// Seed the store with the channel's recent history.
    ///
    /// Channel failures abandon the backfill; they are logged and never
    /// returned so that live listening still starts.
    pub async fn backfill(&self, client: &dyn ChannelClient, limit: usize) -> BackfillSummary {
        let mut summary = BackfillSummary::default();

        info!(limit, "Fetching channel history");
        let messages = match client.get_recent_messages(limit).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %e, "Error fetching historical messages, skipping backfill");
                self.health.record_error(&format!("backfill: {}", e));
                return summary;
            }
        };
        summary.fetched = messages.len();

        // Channel order is newest first; store in arrival order
        for message in messages.iter().rev() {
            match self.process_message(message).await {
                Ok(outcome) => summary.count(&outcome),
                Err(e) => {
                    warn!(message_id = message.id, error = %e, "Failed to store historical message");
                    summary.failed += 1;
                }
            }
        }

        info!(
            fetched = summary.fetched,
            stored = summary.stored,
            duplicates = summary.duplicates,
            rejected = summary.rejected,
            failed = summary.failed,
            "Backfill completed"
        );
        summary
    }

    /// Follow new channel messages until the channel or the store fails
    pub async fn listen(&self, client: &dyn ChannelClient) -> Result<(), IngestError> {
        info!("Listening for new channel messages");
        loop {
            let messages = client.next_messages().await?;
            for message in &messages {
                self.process_message(message).await?;
            }
        }
    }

    /// Connect, backfill, then listen
    pub async fn run(&self, client: &dyn ChannelClient, backfill_limit: usize) -> Result<(), IngestError> {
        self.health.set_state(ListenerState::Starting);
        client.connect().await?;

        self.health.set_state(ListenerState::Backfilling);
        self.backfill(client, backfill_limit).await;

        self.health.set_state(ListenerState::Listening);
        self.listen(client).await
    }
}

/// Run the pipeline in a background task.
///
/// Errors end the task: they are logged here and reflected in the listener
/// health. Nothing restarts the listener.
pub fn spawn_supervised(
    pipeline: Arc<IngestionPipeline>,
    client: Arc<dyn ChannelClient>,
    backfill_limit: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match pipeline.run(client.as_ref(), backfill_limit).await {
            Ok(()) => {
                warn!("Channel listener stopped");
                pipeline.health.set_state(ListenerState::Stopped);
            }
            Err(e) => {
                error!(error = ?e, "ERROR in listener task, real-time ingestion stopped: {}", e);
                pipeline.health.mark_failed(&e.to_string());
            }
        }
    })
}
