// Tick-to-candle aggregation and multi-timeframe resampling.
//
// The aggregator folds ticks into a 1-minute base series per pair and keeps
// only a trailing retention window. Coarser series are recomputed from the
// base series on demand; the retention window keeps that cheap.

use crate::types::Candle;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

fn floor_to(ts: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    let secs = ts.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(width_secs), 0).unwrap_or(ts)
}

pub struct CandleAggregator {
    series: HashMap<String, Vec<Candle>>,
    retention: Duration,
}

impl CandleAggregator {
    pub fn new(retention_minutes: u32) -> Self {
        Self {
            series: HashMap::new(),
            retention: Duration::minutes(i64::from(retention_minutes)),
        }
    }

    /// Fold one tick into the pair's 1-minute series, then trim the window.
    ///
    /// A tick in a new minute opens a candle at open=high=low=close=price;
    /// a tick in the current (or an already-closed) minute mutates the last
    /// candle in place, so candle times stay strictly increasing.
    pub fn update(&mut self, pair: &str, price: f64, ts: DateTime<Utc>) -> &[Candle] {
        let minute = floor_to(ts, 60);
        let series = self.series.entry(pair.to_string()).or_default();

        match series.last_mut() {
            Some(last) if last.time >= minute => {
                last.high = last.high.max(price);
                last.low = last.low.min(price);
                last.close = price;
            }
            _ => series.push(Candle {
                time: minute,
                open: price,
                high: price,
                low: price,
                close: price,
            }),
        }

        let cutoff = ts - self.retention;
        series.retain(|c| c.time >= cutoff);
        series
    }

    pub fn series(&self, pair: &str) -> &[Candle] {
        self.series.get(pair).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Regroup a base series into non-overlapping buckets of `tf_minutes`,
/// aligned to absolute time. Bucket open is the earliest contained candle's
/// open, close the latest's close, high/low the extremes. Buckets with no
/// contributing candles are omitted.
pub fn resample(base: &[Candle], tf_minutes: u32) -> Vec<Candle> {
    if tf_minutes == 0 {
        return Vec::new();
    }
    let width = i64::from(tf_minutes) * 60;
    let mut out: Vec<Candle> = Vec::with_capacity(base.len());
    for c in base {
        let bucket = floor_to(c.time, width);
        match out.last_mut() {
            Some(last) if last.time == bucket => {
                last.high = last.high.max(c.high);
                last.low = last.low.min(c.low);
                last.close = c.close;
            }
            _ => out.push(Candle {
                time: bucket,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(min: i64, sec: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 8, 0, 0).unwrap()
            + Duration::minutes(min)
            + Duration::seconds(sec)
    }

    #[test]
    fn same_minute_ticks_fold_into_one_candle() {
        let mut agg = CandleAggregator::new(90);
        agg.update("EURUSD", 1.10, ts(0, 5));
        agg.update("EURUSD", 1.13, ts(0, 20));
        let series = agg.update("EURUSD", 1.08, ts(0, 45));
        assert_eq!(series.len(), 1);
        let c = series[0];
        assert_eq!(c.open, 1.10);
        assert_eq!(c.high, 1.13);
        assert_eq!(c.low, 1.08);
        assert_eq!(c.close, 1.08);
        assert_eq!(c.time, ts(0, 0));
    }

    #[test]
    fn candle_invariants_hold_over_arbitrary_ticks() {
        let mut agg = CandleAggregator::new(90);
        let prices = [1.2, 1.4, 0.9, 1.1, 1.3, 1.0, 1.5, 0.8, 1.25];
        for (i, &p) in prices.iter().enumerate() {
            agg.update("GBPUSD", p, ts(i as i64 / 3, (i as i64 % 3) * 20));
        }
        let series = agg.series("GBPUSD");
        for w in series.windows(2) {
            assert!(w[0].time < w[1].time);
        }
        for c in series {
            assert!(c.high >= c.open.max(c.close));
            assert!(c.low <= c.open.min(c.close));
        }
    }

    #[test]
    fn retention_drops_candles_older_than_window() {
        let mut agg = CandleAggregator::new(90);
        for min in 0..120 {
            agg.update("USDJPY", 150.0 + min as f64 * 0.01, ts(min, 0));
        }
        let series = agg.series("USDJPY");
        let now = ts(119, 0);
        for c in series {
            assert!(c.time >= now - Duration::minutes(90));
        }
        assert!(series.len() <= 91);
    }

    #[test]
    fn resample_at_one_minute_is_identity() {
        let mut agg = CandleAggregator::new(90);
        for min in 0..10 {
            agg.update("EURUSD", 1.1 + min as f64 * 0.001, ts(min, 0));
            agg.update("EURUSD", 1.1 + min as f64 * 0.001 + 0.0005, ts(min, 30));
        }
        let base = agg.series("EURUSD").to_vec();
        assert_eq!(resample(&base, 1), base);
    }

    #[test]
    fn resample_groups_on_absolute_boundaries() {
        // Base starts at minute 1; the 5-minute bucket is still [0, 5).
        let base = vec![
            Candle { time: ts(1, 0), open: 1.0, high: 1.2, low: 0.9, close: 1.1 },
            Candle { time: ts(3, 0), open: 1.1, high: 1.3, low: 1.0, close: 1.2 },
            Candle { time: ts(6, 0), open: 1.2, high: 1.4, low: 1.1, close: 1.3 },
        ];
        let derived = resample(&base, 5);
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].time, ts(0, 0));
        assert_eq!(derived[0].open, 1.0);
        assert_eq!(derived[0].high, 1.3);
        assert_eq!(derived[0].low, 0.9);
        assert_eq!(derived[0].close, 1.2);
        assert_eq!(derived[1].time, ts(5, 0));
    }

    #[test]
    fn resample_is_idempotent_on_aligned_multiples() {
        let mut base = Vec::new();
        for min in 0..40 {
            base.push(Candle {
                time: ts(min, 0),
                open: 1.0 + min as f64 * 0.01,
                high: 1.02 + min as f64 * 0.01,
                low: 0.99 + min as f64 * 0.01,
                close: 1.01 + min as f64 * 0.01,
            });
        }
        let five = resample(&base, 5);
        let ten_direct = resample(&base, 10);
        let ten_via_five = resample(&five, 10);
        assert_eq!(ten_direct, ten_via_five);
        assert_eq!(resample(&five, 5), five);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(resample(&[], 5).is_empty());
        let agg = CandleAggregator::new(90);
        assert!(agg.series("EURUSD").is_empty());
    }
}
