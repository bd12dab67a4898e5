use crate::bot::resilient::send_text_resilient;
use crate::relay::fetcher::MediaPayload;
use crate::relay::lookup::LookupError;
use crate::relay::shortcode::find_post_link;
use crate::relay::{Relay, RelayError, RelayOutcome};
use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatAction, InputFile},
    utils::command::BotCommands,
};
use tracing::{error, info, warn};

/// Greeting for `/start`
pub const GREETING: &str =
    "Привет! Пришли ссылку на Instagram Reels, я скачаю видео и пришлю файл.";

/// Reply for messages without a recognisable post link
pub const USAGE_HINT: &str = "Пришли ссылку на Reels вида https://www.instagram.com/reel/<код>/ \
     (поддерживаются также /reels/ и /p/)";

/// Reply when the post details contain no video
pub const NO_VIDEO_MESSAGE: &str =
    "Не нашёл прямую ссылку на видео. Возможно, аккаунт приватный или пост удалён.";

/// Caption attached to delivered videos
pub const VIDEO_CAPTION: &str = "Готово ✅";

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start the bot and show welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Explain which links are accepted
    #[command(description = "Show supported links.")]
    Help,
}

/// What the bot sends back for a relay request
#[derive(Debug)]
pub enum Reply {
    /// Upload the downloaded video
    Video(MediaPayload),
    /// Send a text message
    Text(String),
}

/// Maps a relay result to the reply shown to the user.
///
/// Lookup failures are reported as API errors; anything else is reported as an
/// unexpected error.
#[must_use]
pub fn reply_for(result: Result<RelayOutcome, RelayError>) -> Reply {
    match result {
        Ok(RelayOutcome::Video(payload)) => Reply::Video(payload),
        Ok(RelayOutcome::NoVideo) => Reply::Text(NO_VIDEO_MESSAGE.to_string()),
        Ok(RelayOutcome::TooLarge { url }) => Reply::Text(format!(
            "Видео больше лимита Telegram для ботов. Вот ссылка на скачивание:\n{url}"
        )),
        Err(RelayError::Lookup(e)) => Reply::Text(api_error_message(&e)),
        Err(e) => Reply::Text(format!("Неожиданная ошибка: {e}")),
    }
}

fn api_error_message(err: &LookupError) -> String {
    format!("Ошибка API: {err}")
}

/// Handle bot commands
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<()> {
    let text = match cmd {
        Command::Start => GREETING,
        Command::Help => USAGE_HINT,
    };
    send_text_resilient(&bot, msg.chat.id, text).await?;
    Ok(())
}

/// Handle a text message: find a post link, relay it and reply.
///
/// # Errors
///
/// Returns an error if no reply at all could be delivered.
pub async fn handle_text(bot: Bot, msg: Message, relay: Arc<Relay>) -> Result<()> {
    let text = msg.text().unwrap_or_default().trim();
    let Some(link) = find_post_link(text) else {
        send_text_resilient(&bot, msg.chat.id, USAGE_HINT).await?;
        return Ok(());
    };

    info!(chat_id = msg.chat.id.0, link = %link, "Relaying post");

    if let Err(e) = bot
        .send_chat_action(msg.chat.id, ChatAction::UploadVideo)
        .await
    {
        warn!("Failed to send chat action: {e}");
    }

    match reply_for(relay.relay(link).await) {
        Reply::Video(payload) => {
            let (file_name, data) = payload.into_parts();
            let upload = bot
                .send_video(msg.chat.id, InputFile::memory(data).file_name(file_name))
                .caption(VIDEO_CAPTION)
                .await;
            if let Err(e) = upload {
                error!(chat_id = msg.chat.id.0, "Video upload failed: {e}");
                send_text_resilient(&bot, msg.chat.id, format!("Неожиданная ошибка: {e}"))
                    .await?;
            }
        }
        Reply::Text(reply) => {
            send_text_resilient(&bot, msg.chat.id, reply).await?;
        }
    }

    Ok(())
}
