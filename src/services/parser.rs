//! Trading plan message parser
//!
//! Messages follow a fixed line-oriented template:
//!
//! ```text
//! [19/12/2025 10:30:00]
//! Trading Plan BBCA [Sy]:
//! 📝 Buy: 9000, 9050
//! 🟢 TP: 9200, 9300
//! 🔴 SL: 8900
//! ```
//!
//! Anything that does not match is rejected with the rule that failed. The
//! caller drops rejected messages; they are never retried or stored.

use chrono::NaiveDateTime;
use std::fmt;

use crate::models::trading_plan::TradingPlan;

/// Substring identifying a trading plan message (header line and pre-filter)
pub const TRADING_PLAN_MARKER: &str = "Trading Plan";

const NAME_PREFIX: &str = "Trading Plan ";
const NAME_SUFFIX: &str = " [Sy]:";
const BUY_PREFIX: &str = "📝 Buy:";
const TAKE_PROFIT_PREFIX: &str = "🟢 TP:";
const STOP_LOSS_PREFIX: &str = "🔴 SL:";
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const MIN_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanField {
    Buy,
    TakeProfit,
    StopLoss,
}

impl fmt::Display for PlanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanField::Buy => "buy",
            PlanField::TakeProfit => "take-profit",
            PlanField::StopLoss => "stop-loss",
        };
        f.write_str(name)
    }
}

/// Why a message was not accepted as a trading plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("message has {0} lines, need at least 5")]
    TooFewLines(usize),
    #[error("header is not a dd/mm/yyyy hh:mm:ss timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("second line has no trading plan marker")]
    MissingMarker,
    #[error("no symbol name after the trading plan marker")]
    MissingSymbol,
    #[error("no buy line")]
    MissingBuy,
    #[error("no take-profit line")]
    MissingTakeProfit,
    #[error("no stop-loss line")]
    MissingStopLoss,
    #[error("invalid number in {field} line: {value:?}")]
    InvalidNumber { field: PlanField, value: String },
}

/// Parse a channel message into a trading plan.
///
/// `message_id` comes from the channel, not from the text.
pub fn parse_trading_plan(text: &str, message_id: i64) -> Result<TradingPlan, RejectionReason> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < MIN_LINES {
        return Err(RejectionReason::TooFewLines(lines.len()));
    }

    let timestamp = parse_timestamp(lines[0])?;
    let symbol_name = parse_symbol_name(lines[1])?;

    let buy_line = find_line(&lines, BUY_PREFIX).ok_or(RejectionReason::MissingBuy)?;
    let buy_levels = parse_levels(buy_line, PlanField::Buy)?;

    let tp_line = find_line(&lines, TAKE_PROFIT_PREFIX).ok_or(RejectionReason::MissingTakeProfit)?;
    let take_profit_levels = parse_levels(tp_line, PlanField::TakeProfit)?;

    let sl_line = find_line(&lines, STOP_LOSS_PREFIX).ok_or(RejectionReason::MissingStopLoss)?;
    let stop_loss = parse_number(after_colon(sl_line), PlanField::StopLoss)?;

    Ok(TradingPlan {
        message_id,
        timestamp,
        symbol_name,
        buy_levels,
        take_profit_levels,
        stop_loss,
    })
}

fn parse_timestamp(line: &str) -> Result<NaiveDateTime, RejectionReason> {
    let raw = line.trim().trim_matches(|c| c == '[' || c == ']');
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|_| RejectionReason::InvalidTimestamp(raw.to_string()))
}

fn parse_symbol_name(line: &str) -> Result<String, RejectionReason> {
    if !line.contains(TRADING_PLAN_MARKER) {
        return Err(RejectionReason::MissingMarker);
    }

    let (_, rest) = line
        .split_once(NAME_PREFIX)
        .ok_or(RejectionReason::MissingSymbol)?;
    let name = match rest.split_once(NAME_SUFFIX) {
        Some((name, _)) => name,
        None => rest,
    };
    let name = name.trim_end_matches(':').trim();

    if name.is_empty() {
        return Err(RejectionReason::MissingSymbol);
    }
    Ok(name.to_string())
}

fn find_line<'a>(lines: &[&'a str], prefix: &str) -> Option<&'a str> {
    lines.iter().copied().find(|line| line.starts_with(prefix))
}

fn after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest).unwrap_or("")
}

fn parse_levels(line: &str, field: PlanField) -> Result<Vec<i64>, RejectionReason> {
    after_colon(line)
        .split(',')
        .map(|item| parse_number(item, field))
        .collect()
}

fn parse_number(raw: &str, field: PlanField) -> Result<i64, RejectionReason> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| RejectionReason::InvalidNumber {
            field,
            value: trimmed.to_string(),
        })
}
