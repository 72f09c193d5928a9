// Indicator confirmation engine.
//
// Evaluates one derived candle series with a fixed indicator set and counts
// directional votes; four of five confirmations fire a signal. Pure: the
// same series always produces the same result.

use crate::indicators::{Adx, Ema, Macd, Rsi, Stochastic};
use crate::types::{Candle, Direction, SignalResult};

/// Indicator warm-up floor; shorter series are not evaluated.
pub const MIN_CANDLES: usize = 50;

/// Total number of directional conditions per side.
pub const CONDITION_COUNT: u32 = 5;

/// Indicator values at the last candle of a series, plus the previous MACD
/// histogram value for the cross test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub macd_hist: f64,
    pub macd_hist_prev: f64,
    pub rsi: f64,
    pub stoch_signal: f64,
    pub adx: f64,
}

/// Run the indicator set over the full series. None below the warm-up floor.
pub fn snapshot(candles: &[Candle]) -> Option<IndicatorSnapshot> {
    if candles.len() < MIN_CANDLES {
        return None;
    }

    let mut ema_fast = Ema::new(12);
    let mut ema_slow = Ema::new(26);
    let mut macd = Macd::new(12, 26, 9);
    let mut rsi = Rsi::new(14);
    let mut stoch = Stochastic::new(14, 3);
    let mut adx = Adx::new(14);

    let mut snap = IndicatorSnapshot {
        ema_fast: 0.0,
        ema_slow: 0.0,
        macd_hist: 0.0,
        macd_hist_prev: 0.0,
        rsi: 50.0,
        stoch_signal: 50.0,
        adx: 0.0,
    };
    for c in candles {
        snap.macd_hist_prev = snap.macd_hist;
        snap.ema_fast = ema_fast.update(c.close);
        snap.ema_slow = ema_slow.update(c.close);
        snap.macd_hist = macd.update(c.close);
        snap.rsi = rsi.update(c.close);
        snap.stoch_signal = stoch.update(c.high, c.low, c.close);
        snap.adx = adx.update(c.high, c.low, c.close);
    }
    Some(snap)
}

/// Apply the voting rule to a snapshot.
///
/// BUY is checked first: if both sides ever reach the threshold through the
/// shared `trending` vote, BUY wins. That ordering is intentional and load
/// bearing, not a fallthrough accident.
pub fn decide(snap: &IndicatorSnapshot, threshold: u32) -> Option<SignalResult> {
    let up = snap.ema_fast > snap.ema_slow;
    let down = snap.ema_fast < snap.ema_slow;
    let macd_bull = snap.macd_hist_prev < 0.0 && snap.macd_hist > 0.0;
    let macd_bear = snap.macd_hist_prev > 0.0 && snap.macd_hist < 0.0;
    let rsi_oversold = snap.rsi < 30.0;
    let rsi_overbought = snap.rsi > 70.0;
    let stoch_oversold = snap.stoch_signal < 20.0;
    let stoch_overbought = snap.stoch_signal > 80.0;
    // ADX measures trend strength, not direction; both sides share it.
    let trending = snap.adx > 20.0;

    let count = |conds: [bool; 5]| conds.iter().filter(|b| **b).count() as u32;
    let confirmations_buy = count([up, macd_bull, rsi_oversold, stoch_oversold, trending]);
    let confirmations_sell = count([down, macd_bear, rsi_overbought, stoch_overbought, trending]);

    if confirmations_buy >= threshold {
        Some(SignalResult {
            direction: Direction::Buy,
            confirmations: confirmations_buy,
            trend_strength: snap.adx,
        })
    } else if confirmations_sell >= threshold {
        Some(SignalResult {
            direction: Direction::Sell,
            confirmations: confirmations_sell,
            trend_strength: snap.adx,
        })
    } else {
        None
    }
}

/// Full evaluation: indicators plus voting rule.
pub fn evaluate(candles: &[Candle], threshold: u32) -> Option<SignalResult> {
    snapshot(candles).and_then(|snap| decide(&snap, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: impl Iterator<Item = f64>) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2025, 6, 11, 8, 0, 0).unwrap();
        closes
            .enumerate()
            .map(|(i, close)| Candle {
                time: start + Duration::minutes(i as i64),
                open: close,
                high: close + 0.0001,
                low: close - 0.0001,
                close,
            })
            .collect()
    }

    fn snap(
        ema_fast: f64,
        ema_slow: f64,
        macd_hist_prev: f64,
        macd_hist: f64,
        rsi: f64,
        stoch_signal: f64,
        adx: f64,
    ) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_fast,
            ema_slow,
            macd_hist,
            macd_hist_prev,
            rsi,
            stoch_signal,
            adx,
        }
    }

    #[test]
    fn too_short_series_yields_no_signal() {
        let candles = series((0..MIN_CANDLES - 1).map(|i| 1.1 + i as f64 * 0.001));
        assert_eq!(evaluate(&candles, 4), None);
    }

    #[test]
    fn flat_series_yields_no_signal() {
        let candles = series((0..80).map(|_| 1.1));
        assert_eq!(evaluate(&candles, 4), None);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let candles = series((0..80).map(|i| 1.1 + (i as f64 * 0.7).sin() * 0.01));
        assert_eq!(evaluate(&candles, 4), evaluate(&candles, 4));
        assert_eq!(snapshot(&candles), snapshot(&candles));
    }

    #[test]
    fn four_buy_conditions_fire_a_buy_with_count_four() {
        // macd cross up, RSI and stochastic oversold, trending; EMA still down.
        let s = snap(1.0, 1.1, -0.002, 0.001, 25.0, 15.0, 30.0);
        let sig = decide(&s, 4).expect("signal");
        assert_eq!(sig.direction, Direction::Buy);
        assert_eq!(sig.confirmations, 4);
        assert_eq!(sig.trend_strength, 30.0);
    }

    #[test]
    fn three_conditions_are_not_enough() {
        // Only macd cross, RSI oversold, trending.
        let s = snap(1.0, 1.1, -0.002, 0.001, 25.0, 50.0, 30.0);
        assert_eq!(decide(&s, 4), None);
    }

    #[test]
    fn sell_side_mirrors_buy_side() {
        let s = snap(1.1, 1.0, 0.002, -0.001, 75.0, 85.0, 30.0);
        let sig = decide(&s, 4).expect("signal");
        assert_eq!(sig.direction, Direction::Sell);
        assert_eq!(sig.confirmations, 4);
    }

    #[test]
    fn buy_branch_wins_when_only_the_shared_trend_vote_fires() {
        // With threshold 1 the shared ADX vote satisfies both sides; the
        // BUY-first ordering decides.
        let s = snap(1.0, 1.0, 0.0, 0.0, 50.0, 50.0, 30.0);
        let sig = decide(&s, 1).expect("signal");
        assert_eq!(sig.direction, Direction::Buy);
        assert_eq!(sig.confirmations, 1);
    }

    #[test]
    fn five_conditions_report_full_count() {
        let s = snap(1.0, 1.1, -0.002, 0.001, 25.0, 15.0, 30.0);
        // Push EMA into agreement as well.
        let s = IndicatorSnapshot { ema_fast: 1.2, ..s };
        let sig = decide(&s, 4).expect("signal");
        assert_eq!(sig.confirmations, 5);
    }
}
