// Core data types shared across the pipeline, plus the Finnhub wire shapes.

use anyhow::{anyhow, Error};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;

/// One OHLC bucket. `time` is aligned to the start of its bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Buy => "🔺",
            Direction::Sell => "🔻",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            other => Err(anyhow!("unknown signal direction: {other}")),
        }
    }
}

/// Outcome of one signal evaluation. Consumed immediately by the alert
/// gate, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalResult {
    pub direction: Direction,
    /// How many of the five indicator conditions voted for this direction.
    pub confirmations: u32,
    /// ADX value at the last candle.
    pub trend_strength: f64,
}

/// One row of the append-only trade log. `favorable` records whether the
/// alert went out inside a recommended session window; it is a session
/// quality proxy, not a measured trade result.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub timeframe: u32,
    pub direction: Direction,
    pub favorable: bool,
}

// ============================================================================
// Finnhub wire types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Vec<TradeTick>,
}

#[derive(Debug, Deserialize)]
pub struct TradeTick {
    /// Symbol with exchange prefix, e.g. "FX_EURUSD".
    #[serde(rename = "s", default)]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price: Option<f64>,
    #[serde(rename = "t", default)]
    pub timestamp_ms: Option<i64>,
}
