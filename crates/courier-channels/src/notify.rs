//! Notifiers: where rendered content finally goes.
//!
//! Both notifiers can be pinned to a delivery channel: a pinned notifier only
//! accepts recipients on that channel, an unpinned one accepts everyone.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use courier_core::error::{CourierError, Result};
use courier_core::traits::Notifier;
use courier_core::types::Recipient;

/// How many deliveries [`LogNotifier`] remembers.
const HISTORY_LIMIT: usize = 100;

fn channel_matches(filter: &Option<String>, recipient: &Recipient) -> bool {
    match filter {
        Some(channel) => recipient.channel.as_deref() == Some(channel.as_str()),
        None => true,
    }
}

/// One delivery as seen by a notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRecord {
    pub recipient: Recipient,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Writes each delivery to the log and keeps the most recent ones in memory.
#[derive(Debug, Default)]
pub struct LogNotifier {
    channel: Option<String>,
    history: Mutex<VecDeque<DeliveryRecord>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
            ..Self::default()
        }
    }

    /// Recent deliveries, oldest first.
    pub fn history(&self) -> Vec<DeliveryRecord> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier<Recipient, String> for LogNotifier {
    async fn notify(&self, scheduled: &Recipient, content: &String) -> Result<()> {
        tracing::info!("📢 → {scheduled}: {content}");
        let mut history = self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        history.push_back(DeliveryRecord {
            recipient: scheduled.clone(),
            content: content.clone(),
            sent_at: Utc::now(),
        });
        while history.len() > HISTORY_LIMIT {
            history.pop_front();
        }
        Ok(())
    }

    fn accepts(&self, scheduled: &Recipient, _content: &String) -> bool {
        channel_matches(&self.channel, scheduled)
    }
}

/// Generic HTTP webhook: POST with JSON body
/// `{"recipient": {...}, "content": "...", "sent_at": "..."}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    channel: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: Duration::from_secs(10),
            channel: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn for_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Notifier<Recipient, String> for WebhookNotifier {
    async fn notify(&self, scheduled: &Recipient, content: &String) -> Result<()> {
        let payload = DeliveryRecord {
            recipient: scheduled.clone(),
            content: content.clone(),
            sent_at: Utc::now(),
        };

        let mut req = self.client.post(&self.url).json(&payload).timeout(self.timeout);
        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CourierError::Http(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("✅ Webhook notification sent to {}: {scheduled}", self.url);
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(CourierError::notify(format!("Webhook error {status}: {body}")))
        }
    }

    fn accepts(&self, scheduled: &Recipient, _content: &String) -> bool {
        channel_matches(&self.channel, scheduled)
    }
}
