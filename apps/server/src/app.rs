//! Control loop and crash supervisor.

use async_trait::async_trait;
use coinwatch_alerts::{
    command_overview, CoinRegistry, CommandProcessor, Notifier, RegistryError, TelegramBot,
    TelegramError,
};
use coinwatch_core::WatchSettings;
use coinwatch_engine::ChangeDetector;
use coinwatch_feeds::{FeedError, FetchConfig, NoticeSink, PriceFetcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Cooldown before the supervisor restarts a crashed loop.
const RESTART_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Telegram(#[from] TelegramError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Everything the loop needs that survives a restart.
pub struct LoopOptions {
    pub token: String,
    pub chat_id: i64,
    pub coins_file: PathBuf,
    pub interval: Duration,
    pub fetch_attempts: u32,
    pub fetch: FetchConfig,
}

/// Routes fetch progress notices into the Telegram notifier.
struct NoticeRelay(Arc<Notifier>);

#[async_trait]
impl NoticeSink for NoticeRelay {
    async fn notice(&self, text: &str) {
        self.0.send(text).await;
    }
}

/// Run the bot until interrupted, restarting the loop from clean in-memory
/// state after any fault. The coin registry survives on disk; the in-memory
/// threshold and owner filters reset.
pub async fn run_supervised(options: LoopOptions) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown signal received");
            flag.store(true, Ordering::Relaxed);
        }
    });

    loop {
        match run_loop(&options, &shutdown).await {
            Ok(()) => break,
            Err(e) => {
                error!(error = %e, "bot loop crashed, restarting after cooldown");
                tokio::time::sleep(RESTART_COOLDOWN).await;
            }
        }
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
    }
}

/// One life of the bot: fresh settings, fresh baseline, then the polling
/// cycle until shutdown. Commands are always applied before the same cycle's
/// scan decision reads the settings.
async fn run_loop(options: &LoopOptions, shutdown: &AtomicBool) -> Result<(), BotError> {
    let bot = Arc::new(TelegramBot::new(&options.token, options.chat_id)?);
    let notifier = Arc::new(Notifier::new(bot.clone()));
    let mut processor = CommandProcessor::new(bot.clone(), notifier.clone());
    let mut registry = CoinRegistry::open(&options.coins_file);
    let mut settings = WatchSettings::default();
    let mut fetcher = PriceFetcher::new(options.fetch.clone())?;
    let notices = NoticeRelay(notifier.clone());

    // Skip commands that piled up while the bot was down.
    match bot.fast_forward().await {
        Ok(watermark) => {
            settings.last_update_id = watermark;
            if let Some(id) = watermark {
                info!(update_id = id, "skipping Telegram backlog");
            }
        }
        Err(e) => warn!(error = %e, "could not inspect Telegram backlog"),
    }

    info!(coins = registry.book().len(), "starting watch loop");
    notifier.send("Fetching initial prices for USDT pairs...").await;
    let baseline = fetcher.fetch(options.fetch_attempts, &notices).await;
    let mut detector = ChangeDetector::with_baseline(baseline);

    notifier
        .send(&format!("🚀 *Bot is now live!* ✅\n\n{}", command_overview()))
        .await;

    while !shutdown.load(Ordering::Relaxed) {
        processor.process_pending(&mut settings, &mut registry).await?;

        if settings.reset_baseline {
            let baseline = fetcher.fetch(options.fetch_attempts, &notices).await;
            detector.set_baseline(baseline);
            settings.reset_baseline = false;
            info!("baseline reset, skipping scan this cycle");
            continue;
        }

        if settings.scan_enabled {
            let current = fetcher.fetch(options.fetch_attempts, &notices).await;
            let events = detector.detect(&current, registry.book(), &settings);
            for event in &events {
                notifier.alert(event).await;
            }
            if !events.is_empty() {
                info!(alerts = events.len(), "price surge alerts emitted");
            }
            // The baseline always trails the scan by exactly one cycle,
            // even when messaging is muted.
            detector.set_baseline(current);
        }

        tokio::time::sleep(options.interval).await;
    }

    notifier.send("Stopped monitoring.").await;
    Ok(())
}
