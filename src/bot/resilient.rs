//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Replies are retried on transient network failures using exponential backoff with
//! jitter, so a flaky connection to Telegram does not swallow the relay result.

use crate::utils::{retry_telegram_operation, truncate_str};
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message};

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096 characters.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Fits a reply into a single Telegram message.
#[must_use]
pub fn fit_message(text: &str) -> String {
    if text.chars().count() > TELEGRAM_MESSAGE_LIMIT {
        format!("{}...", truncate_str(text, TELEGRAM_MESSAGE_LIMIT))
    } else {
        text.to_string()
    }
}

/// Send a plain text message with automatic retry on network failures.
///
/// Long texts are truncated to [`TELEGRAM_MESSAGE_LIMIT`] characters.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
///
/// # Examples
///
/// ```ignore
/// send_text_resilient(&bot, chat_id, "Не нашёл видео.").await?;
/// ```
pub async fn send_text_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
) -> Result<Message> {
    let text = fit_message(&text.into());
    retry_telegram_operation(|| async {
        bot.send_message(chat_id, text.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}
