//! Telegram channel client
//!
//! Reads posts of one channel through the Telegram Bot API. The bot must be
//! an administrator of the channel to receive `channel_post` updates.
//!
//! - `getMe` validates the token on connect
//! - `getUpdates` with a negative offset returns the most recent queued posts
//!   (the Bot API keeps up to 24 hours of undelivered updates)
//! - `getUpdates` long polling delivers new posts afterwards

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::trading_plan::ChannelInfo;
use crate::services::channel_client::{ChannelClient, ChannelError, ChannelMessage};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API caps getUpdates at 100 updates per call
const MAX_UPDATES_PER_CALL: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Source channel id (e.g. -1001234567890)
    pub channel_id: i64,
    pub api_base: String,
    /// Long polling wait passed to getUpdates
    pub poll_timeout_secs: u64,
}

impl TelegramConfig {
    pub fn new(bot_token: String, channel_id: i64) -> Self {
        Self {
            bot_token,
            channel_id,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    channel_post: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    text: Option<String>,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
    username: Option<String>,
}

pub struct TelegramChannelClient {
    config: TelegramConfig,
    client: reqwest::Client,
    connected: AtomicBool,
    /// Highest update id handed out so far
    last_update_id: Mutex<Option<i64>>,
    /// Channels seen in updates, id -> title
    seen_channels: Mutex<BTreeMap<i64, String>>,
}

impl TelegramChannelClient {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            connected: AtomicBool::new(false),
            last_update_id: Mutex::new(None),
            seen_channels: Mutex::new(BTreeMap::new()),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, ChannelError> {
        let url = format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        );

        // Strip the URL from errors, it contains the bot token
        let response = self
            .client
            .post(&url)
            .json(&params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChannelError::Http(e.without_url()))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            ChannelError::Decode(format!("{} returned HTTP {}: {}", method, status, e))
        })?;

        if !envelope.ok {
            return Err(ChannelError::Api {
                code: envelope.error_code.unwrap_or(i64::from(status.as_u16())),
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope
            .result
            .ok_or_else(|| ChannelError::Decode(format!("{} response has no result", method)))
    }

    fn ensure_connected(&self) -> Result<(), ChannelError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ChannelError::NotConnected)
        }
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        limit: usize,
        wait_secs: u64,
    ) -> Result<Vec<TelegramUpdate>, ChannelError> {
        let mut params = serde_json::json!({
            "limit": limit.clamp(1, MAX_UPDATES_PER_CALL),
            "timeout": wait_secs,
            "allowed_updates": ["channel_post"],
        });
        if let Some(offset) = offset {
            params["offset"] = serde_json::json!(offset);
        }

        self.call(
            "getUpdates",
            params,
            REQUEST_TIMEOUT + Duration::from_secs(wait_secs),
        )
        .await
    }

    /// Advance the update cursor and keep posts of the source channel, oldest first
    fn accept_updates(&self, updates: Vec<TelegramUpdate>) -> Vec<ChannelMessage> {
        if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
            let mut last = self.last_update_id.lock();
            *last = Some(last.map_or(max_id, |current| current.max(max_id)));
        }

        let mut messages = Vec::new();
        for update in updates {
            let Some(post) = update.channel_post else {
                continue;
            };

            if let Some(title) = &post.chat.title {
                self.seen_channels.lock().insert(post.chat.id, title.clone());
            }

            if post.chat.id != self.config.channel_id {
                debug!(chat_id = post.chat.id, "Ignoring post from another channel");
                continue;
            }

            messages.push(ChannelMessage {
                id: post.message_id,
                text: post.text.or(post.caption),
            });
        }
        messages
    }
}

#[async_trait]
impl ChannelClient for TelegramChannelClient {
    async fn connect(&self) -> Result<(), ChannelError> {
        let me: TelegramUser = self
            .call("getMe", serde_json::json!({}), REQUEST_TIMEOUT)
            .await?;
        self.connected.store(true, Ordering::Release);

        info!(
            bot_id = me.id,
            bot = me.username.as_deref().unwrap_or("unknown"),
            channel_id = self.config.channel_id,
            "Telegram client connected"
        );
        Ok(())
    }

    async fn get_recent_messages(&self, limit: usize) -> Result<Vec<ChannelMessage>, ChannelError> {
        self.ensure_connected()?;

        let limit = limit.clamp(1, MAX_UPDATES_PER_CALL);
        let updates = self.get_updates(Some(-(limit as i64)), limit, 0).await?;
        let mut messages = self.accept_updates(updates);
        messages.reverse();

        debug!(count = messages.len(), "Fetched recent channel posts");
        Ok(messages)
    }

    async fn next_messages(&self) -> Result<Vec<ChannelMessage>, ChannelError> {
        self.ensure_connected()?;

        let offset = self.last_update_id.lock().map(|id| id + 1);
        let updates = self
            .get_updates(offset, MAX_UPDATES_PER_CALL, self.config.poll_timeout_secs)
            .await?;
        Ok(self.accept_updates(updates))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ChannelError> {
        self.ensure_connected()?;

        let chat: TelegramChat = self
            .call(
                "getChat",
                serde_json::json!({ "chat_id": self.config.channel_id }),
                REQUEST_TIMEOUT,
            )
            .await?;

        let mut channels = vec![ChannelInfo {
            id: chat.id,
            name: chat.title.unwrap_or_default(),
        }];

        for (id, title) in self.seen_channels.lock().iter() {
            if *id != chat.id {
                channels.push(ChannelInfo {
                    id: *id,
                    name: title.clone(),
                });
            }
        }

        if channels.len() > 1 {
            warn!(
                count = channels.len(),
                "Bot receives posts from more than the configured channel"
            );
        }
        Ok(channels)
    }
}
