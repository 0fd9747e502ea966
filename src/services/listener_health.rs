//! Observable state of the channel listener task
//!
//! The listener does not restart itself. Operators watch `/health` for a
//! `failed` state or a stale `last_event_at` instead of scraping logs.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Starting,
    Backfilling,
    Listening,
    Failed,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenerSnapshot {
    pub state: ListenerState,
    pub started_at: Option<DateTime<Utc>>,
    /// Last time a message was received from the channel
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub processed_count: u64,
    pub stored_count: u64,
    pub error_count: u64,
}

impl Default for ListenerSnapshot {
    fn default() -> Self {
        Self {
            state: ListenerState::Starting,
            started_at: None,
            last_event_at: None,
            last_error: None,
            processed_count: 0,
            stored_count: 0,
            error_count: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct ListenerHealth {
    inner: Arc<RwLock<ListenerSnapshot>>,
}

impl ListenerHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, state: ListenerState) {
        let mut snapshot = self.inner.write();
        if state == ListenerState::Starting {
            snapshot.started_at = Some(Utc::now());
        }
        snapshot.state = state;
    }

    pub fn record_event(&self, stored: bool) {
        let mut snapshot = self.inner.write();
        snapshot.last_event_at = Some(Utc::now());
        snapshot.processed_count += 1;
        if stored {
            snapshot.stored_count += 1;
        }
    }

    pub fn record_error(&self, error: &str) {
        let mut snapshot = self.inner.write();
        snapshot.last_error = Some(error.to_string());
        snapshot.error_count += 1;
    }

    pub fn mark_failed(&self, error: &str) {
        let mut snapshot = self.inner.write();
        snapshot.state = ListenerState::Failed;
        snapshot.last_error = Some(error.to_string());
        snapshot.error_count += 1;
    }

    pub fn snapshot(&self) -> ListenerSnapshot {
        self.inner.read().clone()
    }
}
