//! Outbound reply seam
//!
//! The router only ever talks to [`ReplySink`]; the Telegram adapter and
//! the test recorder implement it.

use async_trait::async_trait;

use crate::session::ChatKey;

/// Telegram rejects messages over 4096 chars; stay below with margin
pub const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Send failed: {0}")]
    SendFailed(String),
}

#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Send an HTML-formatted message to a chat
    async fn send_html(&self, chat_id: ChatKey, text: &str) -> Result<(), SinkError>;
}

/// Split `text` into chunks of at most `max` bytes.
///
/// Prefers to break after a newline; never splits a UTF-8 character.
pub fn split_message(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max {
            chunks.push(remaining);
            break;
        }

        // Last char boundary that fits
        let hard_limit = remaining
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or_else(|| remaining.chars().next().map(char::len_utf8).unwrap_or(remaining.len()));

        let split_at = remaining[..hard_limit]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(hard_limit);

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        remaining = rest;
    }

    chunks
}
