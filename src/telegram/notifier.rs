//! Alert delivery.
//!
//! The staleness monitor only produces [`AlertEvent`]s; this module drains
//! them and hands each one to an [`AlertSink`]. Delivery failures are logged
//! and never fed back into the monitor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::GuardianError;
use crate::monitor::AlertEvent;
use crate::telegram::ui::escape_html;

/// Upper bound on a single delivery attempt.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Destination for alert events.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::DeliveryFailure`] if nobody received it.
    async fn deliver(&self, event: &AlertEvent) -> Result<(), GuardianError>;
}

/// Sends alerts to a fixed set of Telegram chats.
pub struct TelegramSink {
    bot: Bot,
    chats: Vec<ChatId>,
}

impl TelegramSink {
    /// Create a sink for `chats`.
    pub fn new(bot: Bot, chats: &[i64]) -> Self {
        Self {
            bot,
            chats: chats.iter().copied().map(ChatId).collect(),
        }
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<(), GuardianError> {
        let text = escape_html(&event.message);
        let mut delivered = 0_usize;
        for &chat in &self.chats {
            match self
                .bot
                .send_message(chat, text.as_str())
                .parse_mode(ParseMode::Html)
                .await
            {
                Ok(_) => delivered = delivered.saturating_add(1),
                Err(e) => warn!(chat_id = chat.0, error = %e, "alert send failed"),
            }
        }
        if delivered == 0 {
            return Err(GuardianError::DeliveryFailure(format!(
                "no chat out of {} accepted the alert",
                self.chats.len()
            )));
        }
        Ok(())
    }
}

/// Writes alerts to the log. Used when no chat is configured.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<(), GuardianError> {
        warn!(
            source = %event.source,
            kind = ?event.kind,
            at = %event.at,
            "{}",
            event.message
        );
        Ok(())
    }
}

/// Drain `alert_rx` into `sink` until every sender is dropped.
pub async fn run_notifier(sink: Arc<dyn AlertSink>, mut alert_rx: mpsc::Receiver<AlertEvent>) {
    info!("alert notifier started");
    while let Some(event) = alert_rx.recv().await {
        match tokio::time::timeout(DELIVERY_TIMEOUT, sink.deliver(&event)).await {
            Ok(Ok(())) => info!(source = %event.source, kind = ?event.kind, "alert delivered"),
            Ok(Err(e)) => warn!(source = %event.source, error = %e, "alert delivery failed"),
            Err(_) => warn!(
                source = %event.source,
                timeout_secs = DELIVERY_TIMEOUT.as_secs(),
                "alert delivery timed out"
            ),
        }
    }
    info!("alert notifier stopped");
}
