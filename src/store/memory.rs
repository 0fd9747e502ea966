//! In-memory plan store
//!
//! Same semantics as the Postgres store, including the unique message id.

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_orm::DbErr;

use super::{HistoryFilter, PlanStore, StoreError};
use crate::models::trading_plan::TradingPlan;
use crate::services::history::DayWindow;

#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plans: RwLock<Vec<TradingPlan>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }

    /// Snapshot of all stored plans in insertion order
    pub fn all(&self) -> Vec<TradingPlan> {
        self.plans.read().clone()
    }
}

fn newest_first(a: &TradingPlan, b: &TradingPlan) -> std::cmp::Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then(b.message_id.cmp(&a.message_id))
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn find_by_message_id(&self, message_id: i64) -> Result<Option<TradingPlan>, StoreError> {
        Ok(self
            .plans
            .read()
            .iter()
            .find(|p| p.message_id == message_id)
            .cloned())
    }

    async fn insert(&self, plan: &TradingPlan) -> Result<(), StoreError> {
        let mut plans = self.plans.write();
        if plans.iter().any(|p| p.message_id == plan.message_id) {
            return Err(StoreError::Database(DbErr::Custom(format!(
                "duplicate key value violates unique constraint \"ix_trading_plans_message_id\" (message_id={})",
                plan.message_id
            ))));
        }
        plans.push(plan.clone());
        Ok(())
    }

    async fn history(&self, filter: &HistoryFilter) -> Result<Vec<TradingPlan>, StoreError> {
        let needle = filter.symbol.as_ref().map(|s| s.to_lowercase());

        let mut matched: Vec<TradingPlan> = self
            .plans
            .read()
            .iter()
            .filter(|p| match &needle {
                Some(needle) => p.symbol_name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .filter(|p| match &filter.window {
                Some(window) => window.contains(p.timestamp),
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(newest_first);

        Ok(matched
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn previous_for(
        &self,
        plan: &TradingPlan,
        window: Option<&DayWindow>,
    ) -> Result<Option<TradingPlan>, StoreError> {
        Ok(self
            .plans
            .read()
            .iter()
            .filter(|p| p.symbol_name == plan.symbol_name)
            .filter(|p| (p.timestamp, p.message_id) < (plan.timestamp, plan.message_id))
            .filter(|p| window.is_none_or(|w| w.contains(p.timestamp)))
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }
}
