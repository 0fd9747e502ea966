//! Trading plan history queries
//!
//! Plan timestamps carry no offset; they are written in the channel's local
//! time, which is UTC+7. "Today" is therefore the UTC+7 calendar day that
//! contains the current wall-clock instant.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use crate::models::trading_plan::{HistoryEntry, HistoryQuery};
use crate::store::{HistoryFilter, PlanStore, StoreError};

/// Offset of the channel's local time from UTC, in seconds
pub const SITE_UTC_OFFSET_SECS: i32 = 7 * 3600;

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// One UTC+7 calendar day, 00:00:00 to 23:59:59 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    /// The site-local day containing `now`
    pub fn containing(now: DateTime<Utc>) -> Self {
        let local = now.naive_utc() + TimeDelta::seconds(SITE_UTC_OFFSET_SECS.into());
        let start = local.date().and_time(NaiveTime::MIN);

        Self {
            start,
            end: start + TimeDelta::seconds(SECONDS_PER_DAY - 1),
        }
    }

    pub fn today() -> Self {
        Self::containing(Utc::now())
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Fetch a page of history and attach each plan's previous revision.
///
/// The previous revision is the nearest earlier plan for the same symbol,
/// bounded to `window` when one is given.
pub async fn query_history(
    store: &dyn PlanStore,
    query: &HistoryQuery,
    window: Option<DayWindow>,
) -> Result<Vec<HistoryEntry>, StoreError> {
    let filter = HistoryFilter {
        skip: query.skip,
        limit: query.limit(),
        symbol: query.symbol_filter().map(str::to_string),
        window,
    };

    let plans = store.history(&filter).await?;

    let mut entries = Vec::with_capacity(plans.len());
    for plan in plans {
        let previous = store.previous_for(&plan, window.as_ref()).await?;
        entries.push(HistoryEntry {
            plan,
            previous: previous.map(Into::into),
        });
    }

    tracing::debug!(
        skip = filter.skip,
        limit = filter.limit,
        symbol = ?filter.symbol,
        day_window = window.is_some(),
        count = entries.len(),
        "History query completed"
    );

    Ok(entries)
}

/// Plans visible in the current UTC+7 day, newest first
pub async fn query_today(
    store: &dyn PlanStore,
    query: &HistoryQuery,
) -> Result<Vec<HistoryEntry>, StoreError> {
    query_history(store, query, Some(DayWindow::today())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trading_plan::TradingPlan;
    use crate::store::{ingest, MemoryPlanStore};
    use chrono::{NaiveDate, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn plan(message_id: i64, name: &str, timestamp: NaiveDateTime, sl: i64) -> TradingPlan {
        TradingPlan {
            message_id,
            timestamp,
            symbol_name: name.to_string(),
            buy_levels: vec![sl + 100],
            take_profit_levels: vec![sl + 300],
            stop_loss: sl,
        }
    }

    async fn seeded() -> MemoryPlanStore {
        let store = MemoryPlanStore::new();
        for p in [
            plan(1, "BBCA", at(18, 9, 0), 8800),
            plan(2, "BBCA", at(19, 9, 0), 8850),
            plan(3, "TLKM", at(19, 9, 30), 3000),
            plan(4, "BBCA", at(19, 10, 30), 8900),
            plan(5, "BBCA-W", at(19, 11, 0), 10),
        ] {
            ingest(&store, &p).await.unwrap();
        }
        store
    }

    #[test]
    fn test_day_window_uses_utc_plus_7() {
        // 2025-12-18 17:30 UTC is already 2025-12-19 00:30 in UTC+7
        let now = Utc.with_ymd_and_hms(2025, 12, 18, 17, 30, 0).unwrap();
        let window = DayWindow::containing(now);

        assert_eq!(window.start, at(19, 0, 0));
        assert_eq!(window.end, at(19, 23, 59) + chrono::Duration::seconds(59));
        assert!(window.contains(at(19, 0, 0)));
        assert!(!window.contains(at(18, 23, 59)));
    }

    #[test]
    fn test_day_window_boundary() {
        // 16:59:59 UTC is 23:59:59 in UTC+7, the last second of the local day
        let last = DayWindow::containing(Utc.with_ymd_and_hms(2025, 12, 18, 16, 59, 59).unwrap());
        assert_eq!(last.start, at(18, 0, 0));
        assert_eq!(last.end, at(18, 23, 59) + chrono::Duration::seconds(59));

        let next = DayWindow::containing(Utc.with_ymd_and_hms(2025, 12, 18, 17, 0, 0).unwrap());
        assert_eq!(next.start, at(19, 0, 0));
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let store = seeded().await;
        let entries = query_history(&store, &HistoryQuery::default(), None)
            .await
            .unwrap();

        let ids: Vec<i64> = entries.iter().map(|e| e.plan.message_id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_symbol_filter_is_case_insensitive_substring() {
        let store = seeded().await;
        let query = HistoryQuery {
            stock_name: Some("bbca".to_string()),
            ..Default::default()
        };
        let entries = query_history(&store, &query, None).await.unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.plan.symbol_name.as_str()).collect();
        assert_eq!(names, vec!["BBCA-W", "BBCA", "BBCA", "BBCA"]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let store = seeded().await;
        let query = HistoryQuery {
            skip: 1,
            limit: Some(2),
            stock_name: None,
        };
        let entries = query_history(&store, &query, None).await.unwrap();

        let ids: Vec<i64> = entries.iter().map(|e| e.plan.message_id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn test_previous_revision_attached() {
        let store = seeded().await;
        let query = HistoryQuery {
            stock_name: Some("BBCA".to_string()),
            ..Default::default()
        };
        let entries = query_history(&store, &query, None).await.unwrap();

        let latest = entries.iter().find(|e| e.plan.message_id == 4).unwrap();
        let previous = latest.previous.as_ref().unwrap();
        assert_eq!(previous.message_id, 2);
        assert_eq!(previous.sl, 8850);

        // Without a window the chain crosses days
        let second = entries.iter().find(|e| e.plan.message_id == 2).unwrap();
        assert_eq!(second.previous.as_ref().unwrap().message_id, 1);

        let oldest = entries.iter().find(|e| e.plan.message_id == 1).unwrap();
        assert!(oldest.previous.is_none());
    }

    #[tokio::test]
    async fn test_day_window_excludes_previous_day() {
        let store = seeded().await;
        let window = DayWindow::containing(Utc.with_ymd_and_hms(2025, 12, 19, 5, 0, 0).unwrap());
        let query = HistoryQuery {
            stock_name: Some("BBCA".to_string()),
            ..Default::default()
        };
        let entries = query_history(&store, &query, Some(window)).await.unwrap();

        assert!(entries.iter().all(|e| e.plan.message_id != 1));

        // Previous revision lookup stays inside the window too
        let first_of_day = entries.iter().find(|e| e.plan.message_id == 2).unwrap();
        assert!(first_of_day.previous.is_none());
    }

    #[tokio::test]
    async fn test_previous_revision_with_same_timestamp() {
        let store = MemoryPlanStore::new();
        ingest(&store, &plan(1, "BBCA", at(19, 10, 30), 8800)).await.unwrap();
        ingest(&store, &plan(2, "BBCA", at(19, 10, 30), 8850)).await.unwrap();

        let entries = query_history(&store, &HistoryQuery::default(), None)
            .await
            .unwrap();

        let ids: Vec<i64> = entries.iter().map(|e| e.plan.message_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(entries[0].previous.as_ref().unwrap().message_id, 1);
        assert!(entries[1].previous.is_none());
    }
}
