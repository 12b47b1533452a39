//! Rationbot - Entry Point
//!
//! Options:
//! - --json: JSON log lines instead of coloured text
//! - --help / -h, --version / -V

use rationbot::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let json_logs = args.iter().any(|a| a == "--json");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");
    let version_mode = args.iter().any(|a| a == "--version" || a == "-V");

    if version_mode {
        println!("rationbot {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if help_mode {
        println!("Rationbot v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: rationbot [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --json           Log as JSON lines");
        println!("  --version, -V    Show version");
        println!("  --help, -h       Show this help");
        println!();
        println!("Environment variables:");
        println!("  TELOXIDE_TOKEN         Telegram bot token (required)");
        println!("  LOOKUP_BASE_URL        Lookup URL prefix, card number is appended (required)");
        println!("  ACCESS_CODE            Shared access code (required)");
        println!("  SHOW_SENSITIVE         Show fields unmasked (default: false)");
        println!("  LOOKUP_TIMEOUT_SECS    Upstream deadline (default: 15)");
        println!("  RUST_LOG               Log filter (default: info)");
        return Ok(());
    }

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(true)
            .init();
    }

    // Fail before touching the network if anything required is missing
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    info!("Rationbot v{}", env!("CARGO_PKG_VERSION"));
    rationbot::telegram::run_bot(config).await?;

    Ok(())
}
