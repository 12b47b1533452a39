//! Telegram transport
//!
//! Long-polling dispatcher that feeds every text message into the
//! [`Router`]. Uses an explicit Dispatcher for reliable message polling.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{BotCommand, ParseMode, Update},
};

use crate::channel::{split_message, ReplySink, SinkError, MAX_MESSAGE_LEN};
use crate::config::Config;
use crate::gateway::HttpLookupGateway;
use crate::router::{Command, Router};
use crate::session::ChatKey;

/// [`ReplySink`] backed by the Bot API
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn send_html(&self, chat_id: ChatKey, text: &str) -> Result<(), SinkError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let sent = self
                .bot
                .send_message(ChatId(chat_id), chunk)
                .parse_mode(ParseMode::Html)
                .await;

            if let Err(e) = sent {
                // Chunking can cut through a tag; retry without markup
                tracing::debug!("HTML send failed ({}), retrying as plain text", e);
                self.bot
                    .send_message(ChatId(chat_id), chunk)
                    .await
                    .map_err(|e| SinkError::SendFailed(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Run the bot until Ctrl-C
pub async fn run_bot(config: Config) -> Result<()> {
    let gateway = HttpLookupGateway::new(config.lookup_base_url.clone(), config.lookup_timeout)?;
    let router = Arc::new(Router::from_config(&config, Arc::new(gateway)));

    tracing::info!("===========================================");
    tracing::info!("  Rationbot - Starting...");
    tracing::info!("===========================================");
    tracing::info!("Lookup endpoint: {}", config.lookup_base_url);
    tracing::info!("Lookup timeout: {:?}", config.lookup_timeout);
    if config.show_sensitive {
        tracing::warn!("SHOW_SENSITIVE is enabled: records are sent UNMASKED");
    }

    let bot = Bot::new(config.bot_token.as_str());

    // Verify bot token by calling getMe
    tracing::info!("Verifying bot token...");
    match bot.get_me().await {
        Ok(me) => {
            tracing::info!("Bot authenticated: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            );
        }
        Err(e) => {
            tracing::error!("Failed to authenticate bot: {}", e);
            anyhow::bail!("Bot authentication failed: {}", e);
        }
    }

    // Delete any existing webhook to ensure polling works
    if let Err(e) = bot.delete_webhook().await {
        tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    let menu: Vec<BotCommand> = Command::MENU
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect();
    if let Err(e) = bot.set_my_commands(menu).await {
        tracing::warn!("Failed to register command menu: {}", e);
    }

    let sink = TelegramSink::new(bot.clone());

    let handler = dptree::entry().branch(Update::filter_message().endpoint(message_handler));

    tracing::info!("Starting dispatcher with long polling...");

    // The default distribution key is the chat id, so updates from one chat
    // arrive in order; the router's per-chat lock covers the rest.
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, sink])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in message handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::warn!("Dispatcher stopped");
    Ok(())
}

/// Message handler endpoint for the dispatcher
async fn message_handler(
    msg: Message,
    router: Arc<Router>,
    sink: TelegramSink,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    // Non-text messages (stickers, photos, ...) are handled as empty text
    let text = msg.text().unwrap_or("");

    tracing::info!(">>> Message received: chat={}, len={}", chat_id, text.chars().count());

    let outcome = router.handle_text(&sink, chat_id, text).await;
    tracing::debug!("Chat {} handled: {:?}", chat_id, outcome);

    Ok(())
}
