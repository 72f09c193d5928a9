use anyhow::Result;
use fx_signal_bot::config::load_config;
use fx_signal_bot::news::{self, NewsMonitor};
use fx_signal_bot::notify::Notifier;
use fx_signal_bot::outcome::{OutcomeLog, WinRateTable};
use fx_signal_bot::session::SessionPolicy;
use fx_signal_bot::stream::{spawn_reminder, StreamController};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cfg = Arc::new(load_config()?);
    let session = SessionPolicy::new(cfg.tz()?);

    let outcome = OutcomeLog::new(&cfg.trade_log_file);
    let history = outcome.load()?;
    let rates = WinRateTable::rebuild(&history);
    info!("MAIN: loaded {} historical outcomes", history.len());

    let (notifier, notify_task) = Notifier::new(
        &cfg.telegram.bot_token,
        &cfg.telegram.chat_id,
        cfg.telegram.queue_size,
    );

    for line in rates.hourly_report().into_iter().take(20) {
        notifier.send(line);
    }

    let (news_tx, news_rx) = watch::channel(None);
    let news_task = news::spawn(
        NewsMonitor::new(&cfg.finnhub.api_key, cfg.news.window_secs),
        cfg.news.poll_secs,
        news_tx,
    );
    let reminder_task = spawn_reminder(session, notifier.clone(), cfg.reminder_interval_secs);

    let mut controller = StreamController::new(
        Arc::clone(&cfg),
        outcome,
        rates,
        session,
        notifier,
        news_rx,
    );

    tokio::select! {
        result = controller.run() => {
            if let Err(e) = result {
                warn!("MAIN: stream loop exited: {e:#}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("MAIN: shutdown signal received");
        }
    }

    news_task.abort();
    reminder_task.abort();
    notify_task.abort();
    Ok(())
}
