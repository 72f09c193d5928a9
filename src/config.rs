// Configuration loading and validation.
//
// YAML file selected with `--config <path>` (default ./config.yaml), with
// environment-variable fallbacks for the secrets so the file can be checked
// in without credentials.

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use log::info;
use serde::Deserialize;
use std::env;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct FinnhubCfg {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramCfg {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsCfg {
    #[serde(default = "default_news_poll_secs")]
    pub poll_secs: u64,
    #[serde(default = "default_news_window_secs")]
    pub window_secs: u64,
}

impl Default for NewsCfg {
    fn default() -> Self {
        Self {
            poll_secs: default_news_poll_secs(),
            window_secs: default_news_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppCfg {
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<u32>,
    #[serde(default = "default_confirmation_threshold")]
    pub confirmation_threshold: u32,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_trade_log_file")]
    pub trade_log_file: String,
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,
    pub finnhub: FinnhubCfg,
    pub telegram: TelegramCfg,
    #[serde(default)]
    pub news: NewsCfg,
}

fn default_ws_url() -> String {
    "wss://ws.finnhub.io".to_string()
}

fn default_queue_size() -> usize {
    256
}

fn default_news_poll_secs() -> u64 {
    60
}

fn default_news_window_secs() -> u64 {
    900
}

fn default_pairs() -> Vec<String> {
    [
        "EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "USDCAD", "USDCHF", "NZDUSD",
        "EURGBP", "EURJPY", "EURAUD", "EURCAD", "EURCHF", "EURNZD", "GBPJPY",
        "GBPAUD", "GBPCAD", "GBPCHF", "GBPNZD", "AUDJPY", "AUDCAD", "AUDCHF",
        "AUDNZD", "CADJPY", "CHFJPY", "NZDJPY", "NZDCAD", "NZDCHF",
        "USDNOK", "USDSEK", "USDTRY", "USDMXN", "USDZAR",
        "EURUSD_OTC", "GBPUSD_OTC", "USDJPY_OTC", "AUDUSD_OTC", "USDCAD_OTC",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_timeframes() -> Vec<u32> {
    vec![1, 2, 3, 4, 5, 10, 15, 30, 60]
}

fn default_confirmation_threshold() -> u32 {
    4
}

fn default_cooldown_secs() -> u64 {
    120
}

fn default_retention_minutes() -> u32 {
    90
}

fn default_timezone() -> String {
    "Europe/Warsaw".to_string()
}

fn default_trade_log_file() -> String {
    "trade_log.csv".to_string()
}

fn default_reminder_interval_secs() -> u64 {
    10_800
}

impl AppCfg {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {e}", self.timezone))
    }
}

/// Load the config file named by `--config`, falling back to ./config.yaml,
/// then fill empty secrets from the environment and validate.
pub fn load_config() -> Result<AppCfg> {
    let mut args = env::args().skip(1);
    let mut path = "config.yaml".to_string();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            path = args
                .next()
                .context("--config requires a path argument")?;
        }
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading config file {path}"))?;
    let mut cfg: AppCfg =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing config file {path}"))?;

    if cfg.finnhub.api_key.is_empty() {
        if let Ok(v) = env::var("FINNHUB_API_KEY") {
            cfg.finnhub.api_key = v;
        }
    }
    if cfg.telegram.bot_token.is_empty() {
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            cfg.telegram.bot_token = v;
        }
    }
    if cfg.telegram.chat_id.is_empty() {
        if let Ok(v) = env::var("TELEGRAM_CHAT_ID") {
            cfg.telegram.chat_id = v;
        }
    }

    cfg.timeframes.sort_unstable();
    cfg.timeframes.dedup();

    validate_config(&cfg)?;
    info!(
        "CONFIG: loaded {path}: {} pairs, timeframes {:?}, threshold {}/5",
        cfg.pairs.len(),
        cfg.timeframes,
        cfg.confirmation_threshold
    );
    Ok(cfg)
}

pub fn validate_config(cfg: &AppCfg) -> Result<()> {
    if cfg.finnhub.api_key.is_empty() {
        bail!("finnhub.api_key is empty (set it in the config or FINNHUB_API_KEY)");
    }
    if cfg.telegram.bot_token.is_empty() {
        bail!("telegram.bot_token is empty (set it in the config or TELEGRAM_BOT_TOKEN)");
    }
    if cfg.telegram.chat_id.is_empty() {
        bail!("telegram.chat_id is empty (set it in the config or TELEGRAM_CHAT_ID)");
    }
    if cfg.pairs.is_empty() {
        bail!("pairs list is empty");
    }
    if cfg.timeframes.is_empty() {
        bail!("timeframes list is empty");
    }
    if cfg.timeframes.contains(&0) {
        bail!("timeframes must be positive");
    }
    if !(1..=5).contains(&cfg.confirmation_threshold) {
        bail!("confirmation_threshold must be between 1 and 5");
    }
    if cfg.cooldown_secs == 0 {
        bail!("cooldown_secs must be positive");
    }
    let max_tf = cfg.timeframes.iter().max().copied().unwrap_or(1);
    if cfg.retention_minutes < max_tf {
        bail!(
            "retention_minutes ({}) is shorter than the largest timeframe ({max_tf}m)",
            cfg.retention_minutes
        );
    }
    cfg.tz()?;
    Ok(())
}
