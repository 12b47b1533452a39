//! User-facing copy and record rendering
//!
//! Everything here produces Telegram HTML. Values that come from the user
//! or from upstream are escaped before they are embedded.

use teloxide::utils::html::escape;

use crate::gateway::LookupError;
use crate::mask::{mask_name, mask_tail, PLACEHOLDER};
use crate::record::LookupRecord;
use crate::session::StatsSnapshot;

/// Characters of the address left visible when masked
pub const ADDRESS_KEEP: usize = 8;

/// Digits of card and member ids left visible when masked
pub const ID_KEEP: usize = 4;

pub const MASKED_NOTICE: &str = "🔒 Sensitive fields are masked.";

pub const SENSITIVE_BANNER: &str =
    "⚠️ <b>WARNING:</b> sensitive fields are shown UNMASKED. Handle this data with care.";

pub fn greeting(authorized: bool) -> String {
    if authorized {
        "👋 Welcome back!\n\nSend a card number (6-15 digits) to look up the family record.\n/help - Show help"
            .to_string()
    } else {
        "👋 Welcome!\n\nThis bot is access-restricted. Send the access code to continue.\n/help - Show help"
            .to_string()
    }
}

pub fn help() -> &'static str {
    "<b>Help</b>\n\n\
    1. Send the access code once to unlock the bot.\n\
    2. Send a card number (6-15 digits) to look up its family record.\n\n\
    Commands:\n\
    /start - Welcome message\n\
    /help - Show this help\n\
    /stats - Usage statistics"
}

pub fn unknown_command() -> &'static str {
    "Unknown command. Use /help to see what I can do."
}

pub fn access_granted() -> &'static str {
    "✅ Access granted. Send a card number (6-15 digits) to look it up."
}

pub fn access_denied() -> &'static str {
    "❌ Invalid access code. Please try again."
}

pub fn access_required() -> &'static str {
    "🔐 Please send the access code first."
}

pub fn invalid_identifier() -> &'static str {
    "⚠️ Invalid number. Send digits only, 6 to 15 characters long."
}

pub fn fetching(identifier: &str) -> String {
    format!("🔎 Fetching record for <code>{}</code>...", escape(&mask_tail(Some(identifier), ID_KEEP)))
}

pub fn not_found() -> &'static str {
    "📭 No record found for this number."
}

pub fn lookup_failed(err: &LookupError) -> String {
    format!("❌ Lookup failed: {}", escape(&err.user_message()))
}

pub fn generic_failure() -> &'static str {
    "❌ Something went wrong while processing your request. Please try again later."
}

pub fn stats(snapshot: &StatsSnapshot) -> String {
    format!(
        "📊 <b>Statistics</b>\n\n\
        Total users: {}\n\
        Your queries: {}\n\
        Total lookups: {}",
        snapshot.total_users, snapshot.your_queries, snapshot.total_lookups
    )
}

/// Render a family record.
///
/// Members keep their upstream order. With `show_sensitive` the address,
/// names and ids are printed verbatim and a warning banner is appended;
/// otherwise they are masked and a short notice is appended instead.
pub fn render_record(identifier: &str, record: &LookupRecord, show_sensitive: bool) -> String {
    let field = |value: &Option<String>| -> String {
        escape(value.as_deref().filter(|v| !v.is_empty()).unwrap_or(PLACEHOLDER))
    };

    let (card, address) = if show_sensitive {
        (escape(identifier), field(&record.address))
    } else {
        (
            escape(&mask_tail(Some(identifier), ID_KEEP)),
            escape(&mask_tail(record.address.as_deref(), ADDRESS_KEEP)),
        )
    };

    let mut out = String::with_capacity(256 + record.members().len() * 64);
    out.push_str(&format!("📋 <b>Family Record</b> <code>{}</code>\n\n", card));
    out.push_str(&format!("<b>Scheme:</b> {}\n", field(&record.scheme_name)));
    out.push_str(&format!("<b>District:</b> {}\n", field(&record.home_dist_name)));
    out.push_str(&format!("<b>State:</b> {}\n", field(&record.home_state_name)));
    out.push_str(&format!("<b>Address:</b> {}\n\n", address));
    out.push_str(&format!("👨‍👩‍👧 <b>Members ({})</b>\n", record.members().len()));

    for (i, member) in record.members().iter().enumerate() {
        let (name, id) = if show_sensitive {
            (field(&member.name), field(&member.member_id))
        } else {
            (
                escape(&mask_name(member.name.as_deref())),
                escape(&mask_tail(member.member_id.as_deref(), ID_KEEP)),
            )
        };
        out.push_str(&format!(
            "{}. {} ({}), ID: <code>{}</code>\n",
            i + 1,
            name,
            field(&member.relationship),
            id
        ));
    }

    out.push('\n');
    out.push_str(if show_sensitive { SENSITIVE_BANNER } else { MASKED_NOTICE });
    out
}
