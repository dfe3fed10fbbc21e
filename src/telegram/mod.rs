//! Telegram adapter: slash command replies and alert delivery.
//!
//! The bot is read-only. It answers queries from the fusion engine, weather
//! board, and staleness monitor; it never writes sensor data.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fusion::FusionEngine;
use crate::monitor::StalenessMonitor;
use crate::weather::WeatherBoard;

pub mod commands;
pub mod notifier;
pub mod ui;

/// Shared dependencies injected into teloxide handlers via `dptree::deps!`.
#[derive(Clone)]
pub struct SharedState {
    /// Fusion engine to read snapshots from.
    pub engine: Arc<FusionEngine>,
    /// Weather board.
    pub weather: Arc<WeatherBoard>,
    /// Staleness monitor, read for `/status`.
    pub monitor: Arc<Mutex<StalenessMonitor>>,
    /// Loaded configuration.
    pub config: Arc<Config>,
}

impl SharedState {
    /// Build the reply for one message text, or `None` if it is not a command.
    pub fn reply_to(&self, text: &str) -> Option<String> {
        let command = commands::parse_command(text)?;
        let watches = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watches()
            .to_vec();
        let ctx = commands::CommandContext {
            sources: &self.config.sources,
            city: &self.config.weather.city,
            snapshot: self.engine.snapshot(),
            weather: self.weather.current(),
            watches,
            now: Utc::now(),
        };
        Some(commands::respond(&command, &ctx))
    }
}

/// Run the Telegram command dispatcher until `shutdown_rx` fires.
pub async fn run_telegram(bot: Bot, shared: SharedState, mut shutdown_rx: watch::Receiver<bool>) {
    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![shared])
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        while shutdown_rx.changed().await.is_ok() {
            if *shutdown_rx.borrow() {
                break;
            }
        }
        match token.shutdown() {
            Ok(done) => done.await,
            Err(e) => debug!(error = %e, "telegram dispatcher was not running"),
        }
    });

    info!("telegram dispatcher starting");
    dispatcher.dispatch().await;
    info!("telegram dispatcher stopped");
}

/// Handle an incoming Telegram message.
///
/// Drops chats outside `allowed_chats` (when that list is non-empty) and
/// ignores anything that is not a slash command.
async fn handle_message(bot: Bot, msg: Message, state: SharedState) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    if !ui::chat_allowed(&state.config.telegram.allowed_chats, chat_id) {
        warn!(chat_id, "message dropped: chat not in allowed_chats");
        return Ok(());
    }

    let Some(text) = msg.text() else {
        debug!(chat_id, "non-text message ignored");
        return Ok(());
    };

    let Some(reply) = state.reply_to(text) else {
        debug!(chat_id, "non-command message ignored");
        return Ok(());
    };

    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
