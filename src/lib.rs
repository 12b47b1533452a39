//! Rationbot
//!
//! Access-gated Telegram relay for family record lookups.
//!
//! # Features
//!
//! - **Access gate**: a chat must present the shared access code once
//! - **Lookup relay**: card numbers are forwarded to one upstream HTTP endpoint
//! - **Masking**: addresses, names and member ids are redacted for display
//! - **Stats**: per-chat and global lookup counters (process lifetime)
//!
//! # Architecture
//!
//! ```text
//! Telegram ──► Dispatcher ──► Router ──► LookupGateway ──► upstream API
//!                               │
//!                               ├── SessionStore (auth + counters)
//!                               ├── render (copy + masking)
//!                               └── ReplySink ──► Telegram
//! ```

pub mod channel;
pub mod config;
pub mod gateway;
pub mod mask;
pub mod record;
pub mod render;
pub mod router;
pub mod session;
pub mod telegram;

pub use channel::{split_message, ReplySink, SinkError};
pub use config::{Config, ConfigError};
pub use gateway::{HttpLookupGateway, LookupError, LookupGateway};
pub use mask::{mask_name, mask_tail};
pub use record::{FamilyMember, LookupRecord};
pub use router::{is_valid_identifier, Command, Outcome, Router};
pub use session::{AuthResult, ChatKey, Session, SessionError, SessionStore, StatsSnapshot};
