//! Trading plan persistence
//!
//! `PlanStore` is the storage boundary used by the ingestion pipeline and the
//! history endpoints. `postgres::SeaOrmPlanStore` is the production backend;
//! `memory::MemoryPlanStore` backs tests and local runs without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::models::trading_plan::TradingPlan;
use crate::services::history::DayWindow;

pub use memory::MemoryPlanStore;
pub use postgres::SeaOrmPlanStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

/// Filter for a page of history, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub skip: u64,
    pub limit: u64,
    /// Case-insensitive substring match on the symbol name
    pub symbol: Option<String>,
    pub window: Option<DayWindow>,
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Look up a stored plan by upstream message id
    async fn find_by_message_id(&self, message_id: i64) -> Result<Option<TradingPlan>, StoreError>;

    /// Insert a new row; fails if `message_id` is already stored
    async fn insert(&self, plan: &TradingPlan) -> Result<(), StoreError>;

    /// Page of plans ordered by timestamp descending
    async fn history(&self, filter: &HistoryFilter) -> Result<Vec<TradingPlan>, StoreError>;

    /// Nearest earlier plan with the same symbol name, optionally bounded to a day
    async fn previous_for(
        &self,
        plan: &TradingPlan,
        window: Option<&DayWindow>,
    ) -> Result<Option<TradingPlan>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored,
    Duplicate,
}

/// Store `plan` unless its message id was already seen.
///
/// The lookup and the insert are separate statements. Ingestion runs from a
/// single sequential listener, and the unique index on `message_id` turns a
/// lost race into a database error rather than a second row.
pub async fn ingest(store: &dyn PlanStore, plan: &TradingPlan) -> Result<IngestOutcome, StoreError> {
    if store.find_by_message_id(plan.message_id).await?.is_some() {
        return Ok(IngestOutcome::Duplicate);
    }

    store.insert(plan).await?;
    Ok(IngestOutcome::Stored)
}
