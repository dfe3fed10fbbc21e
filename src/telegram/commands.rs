//! Telegram slash command parsing and replies.
//!
//! Replies are pure functions of a [`CommandContext`] captured when the
//! message arrives, so they can be tested without a bot.

use chrono::{DateTime, Utc};

use crate::config::SourcesConfig;
use crate::fusion::{Snapshot, SourceKind};
use crate::gateway;
use crate::monitor::SourceWatch;
use crate::telegram::ui::escape_html;
use crate::weather::WeatherReport;

/// A recognised slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start` or `/help`.
    Help,
    /// `/weather`.
    Weather,
    /// `/average`.
    Average,
    /// `/esp`: the remote device.
    Esp,
    /// `/rpi`: the local sensor.
    Rpi,
    /// `/status`: freshness and alert state.
    Status,
    /// Anything else starting with `/`.
    Unknown(String),
}

/// Parse a message into a command. Returns `None` for non-command text.
///
/// Handles bot-mention suffixes like `/average@climate_bot`.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let without_slash = text.trim().strip_prefix('/')?;
    let full_command = without_slash
        .split_whitespace()
        .next()
        .unwrap_or(without_slash);
    let command = full_command.split('@').next().unwrap_or(full_command);

    Some(match command {
        "start" | "help" => BotCommand::Help,
        "weather" => BotCommand::Weather,
        "average" => BotCommand::Average,
        "esp" => BotCommand::Esp,
        "rpi" => BotCommand::Rpi,
        "status" => BotCommand::Status,
        other => BotCommand::Unknown(other.to_owned()),
    })
}

/// Everything a reply may need, captured once per message.
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    /// Source labels.
    pub sources: &'a SourcesConfig,
    /// City shown in the weather reply.
    pub city: &'a str,
    /// Engine snapshot.
    pub snapshot: Snapshot,
    /// Weather board contents.
    pub weather: WeatherReport,
    /// Monitor state.
    pub watches: Vec<SourceWatch>,
    /// Reply time.
    pub now: DateTime<Utc>,
}

/// List all available commands.
pub fn handle_help() -> String {
    [
        "Welcome to <b>Climate Guardian</b>! Available commands:",
        "",
        "/weather - outdoor weather",
        "/average - fused temperature and humidity",
        "/esp - remote sensor reading",
        "/rpi - local sensor reading",
        "/status - sensor freshness and alerts",
        "/help - show this message",
    ]
    .join("\n")
}

/// Build the HTML reply for `command`.
pub fn respond(command: &BotCommand, ctx: &CommandContext<'_>) -> String {
    match command {
        BotCommand::Help => handle_help(),
        BotCommand::Weather => gateway::weather_text(ctx.city, &ctx.weather),
        BotCommand::Average => gateway::average_text(&ctx.snapshot.fused),
        BotCommand::Esp => gateway::source_text(
            ctx.sources.profile(SourceKind::Remote),
            ctx.snapshot.reading(SourceKind::Remote),
        ),
        BotCommand::Rpi => gateway::source_text(
            ctx.sources.profile(SourceKind::Local),
            ctx.snapshot.reading(SourceKind::Local),
        ),
        BotCommand::Status => {
            gateway::status_text(ctx.sources, &ctx.snapshot, &ctx.watches, ctx.now)
        }
        BotCommand::Unknown(name) => format!("Unknown command: /{}", escape_html(name)),
    }
}
