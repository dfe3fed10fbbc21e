//! HTML helpers for Telegram messages.
//!
//! All output uses HTML parse mode (never MarkdownV2).

/// Escape special HTML characters in user- or config-provided text.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Whether `chat_id` may issue commands. An empty allow-list admits everyone.
pub fn chat_allowed(allowed: &[i64], chat_id: i64) -> bool {
    allowed.is_empty() || allowed.contains(&chat_id)
}
