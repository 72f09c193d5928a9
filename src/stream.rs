// Finnhub websocket ingestion and the per-tick pipeline.
//
// One long-lived connection carries every subscribed pair. The controller
// owns the whole hot path: parse tick, fold into candles, resample per
// timeframe, evaluate, gate, notify, log. A lost connection reconnects
// with exponential backoff and re-subscribes from scratch.

use crate::candles::{resample, CandleAggregator};
use crate::config::AppCfg;
use crate::gate::AlertGate;
use crate::notify::Notifier;
use crate::outcome::{OutcomeLog, WinRateTable};
use crate::session::SessionPolicy;
use crate::signal::evaluate;
use crate::types::StreamMessage;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_tungstenite::tungstenite::Message;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Subscribing,
    Streaming,
}

pub struct StreamController {
    state: StreamState,
    cfg: Arc<AppCfg>,
    pairs: HashSet<String>,
    aggregator: CandleAggregator,
    gate: AlertGate,
    outcome: OutcomeLog,
    rates: WinRateTable,
    session: SessionPolicy,
    notifier: Notifier,
    news_rx: watch::Receiver<Option<DateTime<Utc>>>,
}

impl StreamController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: Arc<AppCfg>,
        outcome: OutcomeLog,
        rates: WinRateTable,
        session: SessionPolicy,
        notifier: Notifier,
        news_rx: watch::Receiver<Option<DateTime<Utc>>>,
    ) -> Self {
        Self {
            state: StreamState::Disconnected,
            pairs: cfg.pairs.iter().cloned().collect(),
            aggregator: CandleAggregator::new(cfg.retention_minutes),
            gate: AlertGate::new(cfg.cooldown_secs),
            cfg,
            outcome,
            rates,
            session,
            notifier,
            news_rx,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Connect, stream, reconnect forever.
    pub async fn run(&mut self) -> Result<()> {
        let mut retry_delay = Duration::from_secs(1);
        loop {
            let url = format!(
                "{}?token={}",
                self.cfg.finnhub.ws_url, self.cfg.finnhub.api_key
            );
            info!("CONNECTION: connecting to {}", self.cfg.finnhub.ws_url);
            match connect_async(url.as_str()).await {
                Ok((ws, _)) => {
                    retry_delay = Duration::from_secs(1);
                    if let Err(e) = self.stream_session(ws).await {
                        warn!("STREAM: session ended: {e:#}");
                    }
                }
                Err(e) => {
                    error!("CONNECTION: connect failed: {e}");
                }
            }
            self.state = StreamState::Disconnected;
            info!("CONNECTION: reconnecting in {retry_delay:?}");
            tokio::time::sleep(retry_delay).await;
            retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
        }
    }

    async fn stream_session(&mut self, ws: WsStream) -> Result<()> {
        let (mut write, mut read) = ws.split();

        self.state = StreamState::Subscribing;
        for pair in &self.cfg.pairs {
            let sub = serde_json::json!({
                "type": "subscribe",
                "symbol": format!("FX_{pair}"),
            });
            write
                .send(Message::Text(sub.to_string()))
                .await
                .with_context(|| format!("subscribing {pair}"))?;
        }
        info!("STREAM: subscribed {} pairs", self.cfg.pairs.len());
        self.state = StreamState::Streaming;

        let now = Utc::now();
        self.notifier.send(format!(
            "✅ Bot is up and streaming!\nCurrent period: *{}*\n\n{}",
            self.session.period_name(now),
            self.session.schedule_message()
        ));

        while let Some(msg) = read.next().await {
            match msg.context("reading websocket frame")? {
                Message::Text(text) => {
                    if let Err(e) = self.handle_text(&text) {
                        warn!("STREAM: tick handling failed: {e:#}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(frame) => {
                    info!("STREAM: server closed the connection: {frame:?}");
                    break;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) -> Result<()> {
        let msg: StreamMessage = serde_json::from_str(text).context("decoding stream message")?;
        if msg.kind != "trade" {
            debug!("STREAM: ignoring message type {:?}", msg.kind);
            return Ok(());
        }

        let now = Utc::now();
        if self.news_suppressed(now) {
            debug!("STREAM: fresh news, holding evaluation");
            return Ok(());
        }

        for tick in &msg.data {
            let Some(price) = tick.price else { continue };
            if !price.is_finite() || price <= 0.0 {
                continue;
            }
            // "FX_EURUSD" -> "EURUSD"
            let Some(pair) = tick.symbol.get(3..) else { continue };
            if !self.pairs.contains(pair) {
                continue;
            }
            self.process_tick(pair.to_string(), price, now);
        }
        Ok(())
    }

    /// An alert hold is in effect while the last detected news change is
    /// younger than one polling interval.
    fn news_suppressed(&self, now: DateTime<Utc>) -> bool {
        match *self.news_rx.borrow() {
            Some(changed) => now - changed <= ChronoDuration::seconds(self.cfg.news.poll_secs as i64),
            None => false,
        }
    }

    fn process_tick(&mut self, pair: String, price: f64, now: DateTime<Utc>) {
        let base = self.aggregator.update(&pair, price, now).to_vec();

        for &tf in &self.cfg.timeframes {
            let derived = if tf == 1 { base.clone() } else { resample(&base, tf) };
            let Some(signal) = evaluate(&derived, self.cfg.confirmation_threshold) else {
                continue;
            };
            let Some((message, record)) = self.gate.consider(
                &pair,
                tf,
                &signal,
                price,
                now,
                &self.rates,
                &self.session,
            ) else {
                continue;
            };
            info!(
                "SIGNAL: {pair} {tf}m {} ({}/5, adx {:.1})",
                signal.direction.as_str(),
                signal.confirmations,
                signal.trend_strength
            );
            self.notifier.send(message);
            if let Err(e) = self.outcome.append(&record) {
                warn!("OUTCOME: append failed: {e:#}");
            }
        }
    }
}

/// Periodic session reminder. Skips the interval's immediate first tick so
/// the startup announcement is not duplicated.
pub fn spawn_reminder(
    session: SessionPolicy,
    notifier: Notifier,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = Utc::now();
            notifier.send(format!(
                "🔔 Reminder {}:\nCurrent period: *{}*\n\n💡 Send /schedule for the full timetable.",
                session.local_time_short(now),
                session.period_name(now)
            ));
        }
    })
}
