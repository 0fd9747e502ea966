//! Trading plan record and the request/response models built around it
//!
//! The JSON field names (`datetime`, `name`, `buy`, `tp`, `sl`) are what the
//! frontend consumes on both the SSE streams and the history endpoint.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One trading plan extracted from a channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPlan {
    /// Upstream message id, unique per channel
    pub message_id: i64,
    /// Timestamp written in the message header (site-local, no offset)
    #[serde(rename = "datetime")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "name")]
    pub symbol_name: String,
    #[serde(rename = "buy")]
    pub buy_levels: Vec<i64>,
    #[serde(rename = "tp")]
    pub take_profit_levels: Vec<i64>,
    #[serde(rename = "sl")]
    pub stop_loss: i64,
}

impl TradingPlan {
    /// Case-insensitive comparison against a symbol from a URL or query.
    pub fn matches_symbol(&self, symbol: &str) -> bool {
        self.symbol_name.to_lowercase() == symbol.to_lowercase()
    }
}

/// Financial fields of the plan that preceded another one for the same symbol.
///
/// The name is left out since it always equals the parent's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviousPlan {
    pub message_id: i64,
    pub datetime: NaiveDateTime,
    pub buy: Vec<i64>,
    pub tp: Vec<i64>,
    pub sl: i64,
}

impl From<TradingPlan> for PreviousPlan {
    fn from(plan: TradingPlan) -> Self {
        Self {
            message_id: plan.message_id,
            datetime: plan.timestamp,
            buy: plan.buy_levels,
            tp: plan.take_profit_levels,
            sl: plan.stop_loss,
        }
    }
}

/// A history row: the plan plus the revision it replaced, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub plan: TradingPlan,
    pub previous: Option<PreviousPlan>,
}

pub const DEFAULT_HISTORY_LIMIT: u64 = 50;
pub const MAX_HISTORY_LIMIT: u64 = 500;

/// Query parameters for the history endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
    /// Case-insensitive substring filter on the symbol name
    pub stock_name: Option<String>,
}

impl HistoryQuery {
    /// Effective page size, defaulted and clamped to `1..=MAX_HISTORY_LIMIT`.
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    /// Symbol filter with blank values treated as absent.
    pub fn symbol_filter(&self) -> Option<&str> {
        self.stock_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub trading_plans: Vec<HistoryEntry>,
    pub skip: u64,
    pub limit: u64,
    pub count: usize,
}

/// A channel the bot can see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<ChannelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
