//! coinwatch - KuCoin price-surge Telegram bot.
//!
//! Polls KuCoin for USDT-pair tickers, alerts a Telegram chat on rapid
//! upward moves, and takes its configuration over chat commands.

mod app;

use app::LoopOptions;
use clap::Parser;
use coinwatch_feeds::FetchConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// coinwatch CLI
#[derive(Parser, Debug)]
#[command(name = "coinwatch-bot")]
#[command(about = "KuCoin price-surge Telegram bot", long_about = None)]
struct Args {
    /// Coin registry file path
    #[arg(short, long, default_value = "coins.json")]
    coins_file: PathBuf,

    /// Seconds to sleep between scan cycles
    #[arg(short, long, default_value_t = 5)]
    interval: u64,

    /// Price fetch attempts per cycle
    #[arg(long, default_value_t = 3)]
    fetch_attempts: u32,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    let token = match std::env::var("TELEGRAM_BOT_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => {
            tracing::error!("TELEGRAM_BOT_TOKEN is not set");
            std::process::exit(1);
        }
    };
    let chat_id = match std::env::var("TELEGRAM_CHAT_ID")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
    {
        Some(chat_id) => chat_id,
        None => {
            tracing::error!("TELEGRAM_CHAT_ID is not set or is not an integer chat id");
            std::process::exit(1);
        }
    };

    info!("🚀 coinwatch starting...");
    info!("  Coins file: {}", args.coins_file.display());
    info!("  Scan interval: {}s", args.interval);
    info!("  Fetch attempts: {}", args.fetch_attempts);

    let options = LoopOptions {
        token,
        chat_id,
        coins_file: args.coins_file,
        interval: Duration::from_secs(args.interval),
        fetch_attempts: args.fetch_attempts,
        fetch: FetchConfig::default(),
    };

    app::run_supervised(options).await;

    info!("👋 coinwatch stopped");
}
