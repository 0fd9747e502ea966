//! Postgres plan store backed by SeaORM

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};

use super::{HistoryFilter, PlanStore, StoreError};
use crate::entities::{prelude::TradingPlans, trading_plans};
use crate::models::trading_plan::TradingPlan;
use crate::services::history::DayWindow;

#[derive(Clone)]
pub struct SeaOrmPlanStore {
    db: DatabaseConnection,
}

impl SeaOrmPlanStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl TryFrom<trading_plans::Model> for TradingPlan {
    type Error = StoreError;

    fn try_from(row: trading_plans::Model) -> Result<Self, Self::Error> {
        let id = row.id;
        let levels = |value: serde_json::Value, column: &str| {
            serde_json::from_value::<Vec<i64>>(value)
                .map_err(|e| StoreError::Corrupt(format!("row {} column {}: {}", id, column, e)))
        };

        Ok(TradingPlan {
            message_id: row.message_id,
            timestamp: row.datetime,
            buy_levels: levels(row.buy, "buy")?,
            take_profit_levels: levels(row.tp, "tp")?,
            symbol_name: row.name,
            stop_loss: row.sl,
        })
    }
}

fn to_plans(rows: Vec<trading_plans::Model>) -> Result<Vec<TradingPlan>, StoreError> {
    rows.into_iter().map(TradingPlan::try_from).collect()
}

/// Escape LIKE wildcards so user input is matched literally
fn like_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl PlanStore for SeaOrmPlanStore {
    async fn find_by_message_id(&self, message_id: i64) -> Result<Option<TradingPlan>, StoreError> {
        TradingPlans::find()
            .filter(trading_plans::Column::MessageId.eq(message_id))
            .one(&self.db)
            .await?
            .map(TradingPlan::try_from)
            .transpose()
    }

    async fn insert(&self, plan: &TradingPlan) -> Result<(), StoreError> {
        let row = trading_plans::ActiveModel {
            message_id: Set(plan.message_id),
            datetime: Set(plan.timestamp),
            name: Set(plan.symbol_name.clone()),
            buy: Set(serde_json::json!(plan.buy_levels)),
            tp: Set(serde_json::json!(plan.take_profit_levels)),
            sl: Set(plan.stop_loss),
            ..Default::default()
        };
        row.insert(&self.db).await?;
        Ok(())
    }

    async fn history(&self, filter: &HistoryFilter) -> Result<Vec<TradingPlan>, StoreError> {
        let rows = history_query(filter).all(&self.db).await?;
        to_plans(rows)
    }

    async fn previous_for(
        &self,
        plan: &TradingPlan,
        window: Option<&DayWindow>,
    ) -> Result<Option<TradingPlan>, StoreError> {
        previous_query(plan, window)
            .one(&self.db)
            .await?
            .map(TradingPlan::try_from)
            .transpose()
    }
}

/// Page of plans, newest first with message id as the tie-break
fn history_query(filter: &HistoryFilter) -> Select<TradingPlans> {
    let mut query = TradingPlans::find()
        .order_by_desc(trading_plans::Column::Datetime)
        .order_by_desc(trading_plans::Column::MessageId);

    if let Some(symbol) = &filter.symbol {
        let pattern = format!("%{}%", like_escape(&symbol.to_lowercase()));
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(trading_plans::Column::Name))).like(pattern),
        );
    }

    if let Some(window) = &filter.window {
        query = query.filter(trading_plans::Column::Datetime.between(window.start, window.end));
    }

    query.offset(filter.skip).limit(filter.limit)
}

/// Plans of the same symbol ordered before `plan` in history order, nearest first
fn previous_query(plan: &TradingPlan, window: Option<&DayWindow>) -> Select<TradingPlans> {
    let earlier = Condition::any()
        .add(trading_plans::Column::Datetime.lt(plan.timestamp))
        .add(
            Condition::all()
                .add(trading_plans::Column::Datetime.eq(plan.timestamp))
                .add(trading_plans::Column::MessageId.lt(plan.message_id)),
        );

    let mut query = TradingPlans::find()
        .filter(trading_plans::Column::Name.eq(plan.symbol_name.as_str()))
        .filter(earlier);

    if let Some(window) = window {
        query = query.filter(trading_plans::Column::Datetime.gte(window.start));
    }

    query
        .order_by_desc(trading_plans::Column::Datetime)
        .order_by_desc(trading_plans::Column::MessageId)
}
