//! Message Router
//!
//! Applies the access policy to each inbound text message and drives a
//! lookup when the chat is authorized:
//!
//! ```text
//! text ──► command?  ──► greet / help / stats
//!            │
//!            ├── unauthorized ──► access code check ──► granted / denied
//!            │
//!            └── authorized ──► validate ──► fetch ──► render ──► reply
//! ```
//!
//! Messages from one chat are processed strictly one at a time; different
//! chats run concurrently.

use futures_util::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::channel::ReplySink;
use crate::config::Config;
use crate::gateway::{LookupError, LookupGateway};
use crate::mask::mask_tail;
use crate::render;
use crate::session::{AuthResult, ChatKey, ChatLocks, SessionStore};

// ASCII digits only; `\d` would also accept other Unicode digits
static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6,15}$").unwrap());

/// Whether `text` is a well-formed card number
pub fn is_valid_identifier(text: &str) -> bool {
    IDENTIFIER_RE.is_match(text)
}

/// Bot commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Stats,
    Unknown,
}

impl Command {
    /// Commands shown in the client's menu
    pub const MENU: [(&'static str, &'static str); 3] = [
        ("start", "Welcome message"),
        ("help", "Show help"),
        ("stats", "Usage statistics"),
    ];

    /// Parse `/cmd`, `/cmd@botname` or `/cmd args`.
    ///
    /// Returns `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let word = text.strip_prefix('/')?.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("").to_ascii_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "stats" => Command::Stats,
            _ => Command::Unknown,
        })
    }
}

/// Which branch handled a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Informational command or empty text
    Command(Command),
    AccessGranted,
    AccessDenied,
    InvalidIdentifier,
    /// Upstream has no usable record
    NotFound,
    /// Upstream call failed
    LookupFailed,
    /// Record rendered and sent
    Delivered { members: usize },
    /// Unexpected failure; the user got the generic notice
    Failed,
}

/// Routes inbound messages. Owns the session store.
pub struct Router {
    sessions: SessionStore,
    locks: ChatLocks,
    gateway: Arc<dyn LookupGateway>,
    access_code: Zeroizing<String>,
    show_sensitive: bool,
}

impl Router {
    pub fn new(gateway: Arc<dyn LookupGateway>, access_code: &str, show_sensitive: bool) -> Self {
        Self {
            sessions: SessionStore::new(),
            locks: ChatLocks::new(),
            gateway,
            access_code: Zeroizing::new(access_code.to_string()),
            show_sensitive,
        }
    }

    pub fn from_config(config: &Config, gateway: Arc<dyn LookupGateway>) -> Self {
        Self::new(gateway, config.access_code.as_str(), config.show_sensitive)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound text message. Never fails: every error is
    /// reported to the chat and logged here.
    pub async fn handle_text<S>(&self, sink: &S, chat_id: ChatKey, text: &str) -> Outcome
    where
        S: ReplySink + ?Sized,
    {
        let _guard = self.locks.acquire(chat_id).await;

        if self.sessions.touch(chat_id) {
            info!("New session for chat {}", chat_id);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            reply(sink, chat_id, render::unknown_command()).await;
            return Outcome::Command(Command::Unknown);
        }
        if let Some(command) = Command::parse(trimmed) {
            return self.handle_command(sink, chat_id, command).await;
        }

        if !self.sessions.is_authorized(chat_id) {
            // Compared verbatim
            return match self.sessions.check_access(chat_id, text, &self.access_code) {
                AuthResult::Granted => {
                    info!("Access granted for chat {}", chat_id);
                    reply(sink, chat_id, render::access_granted()).await;
                    Outcome::AccessGranted
                }
                AuthResult::Denied => {
                    warn!("Invalid access code from chat {}", chat_id);
                    reply(sink, chat_id, render::access_denied()).await;
                    Outcome::AccessDenied
                }
                AuthResult::AlreadyAuthorized => {
                    // Only reachable if authorization raced ahead of this
                    // check, which the chat lock rules out
                    error!("Chat {} authorized between checks", chat_id);
                    reply(sink, chat_id, render::generic_failure()).await;
                    Outcome::Failed
                }
            };
        }

        if !is_valid_identifier(trimmed) {
            debug!("Rejected malformed identifier from chat {}", chat_id);
            reply(sink, chat_id, render::invalid_identifier()).await;
            return Outcome::InvalidIdentifier;
        }

        let span = tracing::info_span!(
            "lookup",
            request_id = %Uuid::new_v4(),
            chat_id,
            card = %mask_tail(Some(trimmed), render::ID_KEEP),
        );
        self.lookup(sink, chat_id, trimmed).instrument(span).await
    }

    async fn handle_command<S>(&self, sink: &S, chat_id: ChatKey, command: Command) -> Outcome
    where
        S: ReplySink + ?Sized,
    {
        debug!("Command {:?} from chat {}", command, chat_id);

        match command {
            Command::Start => {
                let text = render::greeting(self.sessions.is_authorized(chat_id));
                reply(sink, chat_id, &text).await;
            }
            Command::Help => reply(sink, chat_id, render::help()).await,
            Command::Stats => {
                if self.sessions.is_authorized(chat_id) {
                    let text = render::stats(&self.sessions.stats(chat_id));
                    reply(sink, chat_id, &text).await;
                } else {
                    reply(sink, chat_id, render::access_required()).await;
                }
            }
            Command::Unknown => reply(sink, chat_id, render::unknown_command()).await,
        }

        Outcome::Command(command)
    }

    async fn lookup<S>(&self, sink: &S, chat_id: ChatKey, identifier: &str) -> Outcome
    where
        S: ReplySink + ?Sized,
    {
        // Best effort
        if let Err(e) = sink.send_html(chat_id, &render::fetching(identifier)).await {
            debug!("Fetching notice not delivered: {}", e);
        }

        let fetched = AssertUnwindSafe(self.gateway.fetch_family_record(identifier))
            .catch_unwind()
            .await;

        let record = match fetched {
            Ok(Ok(record)) if record.is_usable() => record,
            Ok(Ok(_)) | Ok(Err(LookupError::NotFound)) => {
                info!("No record upstream");
                reply(sink, chat_id, render::not_found()).await;
                return Outcome::NotFound;
            }
            Ok(Err(e)) => {
                warn!("Lookup failed: {}", e);
                reply(sink, chat_id, &render::lookup_failed(&e)).await;
                return Outcome::LookupFailed;
            }
            Err(_) => {
                error!("Lookup gateway panicked");
                reply(sink, chat_id, render::generic_failure()).await;
                return Outcome::Failed;
            }
        };

        let show_sensitive = self.show_sensitive;
        let rendered = std::panic::catch_unwind(AssertUnwindSafe(|| {
            render::render_record(identifier, &record, show_sensitive)
        }));
        let rendered = match rendered {
            Ok(text) => text,
            Err(_) => {
                error!("Rendering panicked");
                reply(sink, chat_id, render::generic_failure()).await;
                return Outcome::Failed;
            }
        };

        // Counted only once the record is fetched, parsed and rendered
        match self.sessions.record_lookup(chat_id) {
            Ok(count) => info!("Lookup succeeded ({} members, chat total {})", record.members().len(), count),
            Err(e) => {
                error!("{}", e);
                reply(sink, chat_id, render::generic_failure()).await;
                return Outcome::Failed;
            }
        }

        reply(sink, chat_id, &rendered).await;
        Outcome::Delivered { members: record.members().len() }
    }
}

async fn reply<S>(sink: &S, chat_id: ChatKey, text: &str)
where
    S: ReplySink + ?Sized,
{
    if let Err(e) = sink.send_html(chat_id, text).await {
        warn!("Failed to send reply to chat {}: {}", chat_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("123456"));
        assert!(is_valid_identifier("116440054586"));
        assert!(is_valid_identifier("123456789012345"));

        assert!(!is_valid_identifier("12345"));
        assert!(!is_valid_identifier("1234567890123456"));
        assert!(!is_valid_identifier("abc123"));
        assert!(!is_valid_identifier("123 456"));
        assert!(!is_valid_identifier(""));
        // Arabic-Indic digits
        assert!(!is_valid_identifier("١٢٣٤٥٦"));
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/HELP"), Some(Command::Help));
        assert_eq!(Command::parse("/stats@RationBot"), Some(Command::Stats));
        assert_eq!(Command::parse("/start extra args"), Some(Command::Start));
        assert_eq!(Command::parse("/unknown"), Some(Command::Unknown));
        assert_eq!(Command::parse("/"), Some(Command::Unknown));
        assert_eq!(Command::parse("1234"), None);
        assert_eq!(Command::parse("hello /start"), None);
    }
}
