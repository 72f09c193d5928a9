// Append-only outcome log and win-rate estimation.
//
// Every emitted alert appends one CSV row; nothing is ever rewritten. The
// win-rate table is rebuilt from the full history once at startup, before
// the ingestion loop starts, so the formatter never sees a partial table.

use crate::types::OutcomeRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};
use log::warn;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Reported instead of an unreliable small-sample estimate.
pub const PLACEHOLDER_RATE: &str = "~75–80%";

/// Groups need more than this many records for a real percentage.
const MIN_SAMPLES: usize = 4;

pub struct OutcomeLog {
    path: PathBuf,
}

impl OutcomeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the full history. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<OutcomeRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("opening outcome log {}", self.path.display()))?;
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            match parse_row(&row) {
                Some(rec) => records.push(rec),
                None => warn!("OUTCOME: skipping malformed row: {row:?}"),
            }
        }
        Ok(records)
    }

    /// Durable, ordered append. Creates the file with a header row first.
    pub fn append(&self, rec: &OutcomeRecord) -> Result<()> {
        let new_file = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening outcome log {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if new_file {
            writer.write_record(["datetime", "pair", "tf", "signal", "success"])?;
        }
        writer.write_record([
            rec.timestamp.to_rfc3339(),
            rec.pair.clone(),
            rec.timeframe.to_string(),
            rec.direction.as_str().to_string(),
            u8::from(rec.favorable).to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

fn parse_row(row: &csv::StringRecord) -> Option<OutcomeRecord> {
    let timestamp = DateTime::parse_from_rfc3339(row.get(0)?)
        .ok()?
        .with_timezone(&Utc);
    Some(OutcomeRecord {
        timestamp,
        pair: row.get(1)?.to_string(),
        timeframe: row.get(2)?.parse().ok()?,
        direction: row.get(3)?.parse().ok()?,
        favorable: row.get(4)? == "1",
    })
}

/// Historical win-rate estimates keyed by (pair, timeframe), with an hourly
/// breakdown used only for the startup batch report.
pub struct WinRateTable {
    rates: BTreeMap<(String, u32), String>,
    hourly: BTreeMap<(String, u32, u32), (usize, usize)>,
}

impl WinRateTable {
    pub fn rebuild(records: &[OutcomeRecord]) -> Self {
        let mut groups: BTreeMap<(String, u32), (usize, usize)> = BTreeMap::new();
        let mut hourly: BTreeMap<(String, u32, u32), (usize, usize)> = BTreeMap::new();
        for rec in records {
            let key = (rec.pair.clone(), rec.timeframe);
            let entry = groups.entry(key).or_default();
            entry.0 += usize::from(rec.favorable);
            entry.1 += 1;
            let hkey = (rec.pair.clone(), rec.timeframe, rec.timestamp.hour());
            let entry = hourly.entry(hkey).or_default();
            entry.0 += usize::from(rec.favorable);
            entry.1 += 1;
        }
        let rates = groups
            .into_iter()
            .filter(|(_, (_, total))| *total > MIN_SAMPLES)
            .map(|(key, (wins, total))| {
                let pct = (wins as f64 / total as f64 * 100.0).round() as i64;
                (key, format!("{pct}%"))
            })
            .collect();
        Self { rates, hourly }
    }

    /// Estimated success for a pair/timeframe; a placeholder range below the
    /// sample threshold.
    pub fn rate(&self, pair: &str, timeframe: u32) -> &str {
        self.rates
            .get(&(pair.to_string(), timeframe))
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_RATE)
    }

    /// Per-hour summary lines for groups with enough samples. Offline
    /// report only; the live formatter never consults this.
    pub fn hourly_report(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for ((pair, tf, hour), (wins, total)) in &self.hourly {
            if *total <= MIN_SAMPLES {
                continue;
            }
            let rate = (*wins as f64 / *total as f64 * 1000.0).round() / 10.0;
            if rate > 0.0 {
                lines.push(format!("📈 {pair} | {tf}m | {hour}:00 — {rate}% over {total} signals"));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use chrono::TimeZone;

    fn rec(pair: &str, tf: u32, hour: u32, favorable: bool) -> OutcomeRecord {
        OutcomeRecord {
            timestamp: Utc.with_ymd_and_hms(2025, 6, 11, hour, 30, 0).unwrap(),
            pair: pair.to_string(),
            timeframe: tf,
            direction: Direction::Buy,
            favorable,
        }
    }

    #[test]
    fn small_samples_report_the_placeholder_range() {
        let records: Vec<_> = (0..4).map(|_| rec("EURUSD", 5, 10, true)).collect();
        let table = WinRateTable::rebuild(&records);
        assert_eq!(table.rate("EURUSD", 5), PLACEHOLDER_RATE);
        assert_eq!(table.rate("GBPUSD", 5), PLACEHOLDER_RATE);
    }

    #[test]
    fn five_records_three_favorable_report_sixty_percent() {
        let mut records = vec![rec("EURUSD", 5, 10, true); 3];
        records.extend(vec![rec("EURUSD", 5, 10, false); 2]);
        let table = WinRateTable::rebuild(&records);
        assert_eq!(table.rate("EURUSD", 5), "60%");
    }

    #[test]
    fn hourly_report_respects_the_same_threshold() {
        let mut records = vec![rec("EURUSD", 5, 10, true); 5];
        records.extend(vec![rec("EURUSD", 5, 11, true); 4]);
        let table = WinRateTable::rebuild(&records);
        let report = table.hourly_report();
        assert_eq!(report.len(), 1);
        assert!(report[0].contains("10:00"));
        assert!(report[0].contains("100%"));
    }

    #[test]
    fn empty_history_builds_an_empty_table() {
        let table = WinRateTable::rebuild(&[]);
        assert_eq!(table.rate("EURUSD", 1), PLACEHOLDER_RATE);
        assert!(table.hourly_report().is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let log = OutcomeLog::new(dir.path().join("trade_log.csv"));
        assert!(log.load().unwrap().is_empty());

        let first = rec("EURUSD", 5, 10, true);
        let second = OutcomeRecord {
            direction: Direction::Sell,
            favorable: false,
            ..rec("GBPJPY_OTC", 15, 21, false)
        };
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let history = log.load().unwrap();
        assert_eq!(history, vec![first, second]);
    }
}
