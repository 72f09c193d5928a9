// Alert gating and message formatting.
//
// The gate enforces a per-pair cooldown and turns an accepted signal into
// the outgoing Telegram text plus the trade-log row. Cooldown is recorded
// only when an alert is actually emitted, so a suppressed candidate does
// not push the window forward.

use crate::outcome::WinRateTable;
use crate::session::SessionPolicy;
use crate::signal::CONDITION_COUNT;
use crate::types::{Direction, OutcomeRecord, SignalResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub struct AlertGate {
    cooldown: Duration,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl AlertGate {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs as i64),
            last_alert: HashMap::new(),
        }
    }

    /// Decide whether a signal becomes an alert. Returns the formatted
    /// message and the log row, or None while the pair is cooling down.
    pub fn consider(
        &mut self,
        pair: &str,
        timeframe: u32,
        signal: &SignalResult,
        price: f64,
        now: DateTime<Utc>,
        rates: &WinRateTable,
        session: &SessionPolicy,
    ) -> Option<(String, OutcomeRecord)> {
        if let Some(last) = self.last_alert.get(pair) {
            if now - *last <= self.cooldown {
                return None;
            }
        }
        self.last_alert.insert(pair.to_string(), now);

        let good_session = session.is_good_time(now);
        let message = format_alert(pair, timeframe, signal, price, now, rates, session, good_session);
        let record = OutcomeRecord {
            timestamp: now,
            pair: pair.to_string(),
            timeframe,
            direction: signal.direction,
            favorable: good_session,
        };
        Some((message, record))
    }
}

#[allow(clippy::too_many_arguments)]
fn format_alert(
    pair: &str,
    timeframe: u32,
    signal: &SignalResult,
    price: f64,
    now: DateTime<Utc>,
    rates: &WinRateTable,
    session: &SessionPolicy,
    good_session: bool,
) -> String {
    let hold = match signal.direction {
        Direction::Buy => "UP",
        Direction::Sell => "DOWN",
    };
    let comment = match signal.direction {
        Direction::Buy => "A pullback formed after the breakout. Buyers are active.",
        Direction::Sell => "Price turned down after testing resistance. Sellers dominate.",
    };
    let otc_note = if pair.contains("OTC") {
        "\n⚠️ WARNING: this is an *OTC* instrument"
    } else {
        "\n🔵 Regular currency pair"
    };
    let session_note = if good_session {
        ""
    } else {
        "\n⚠️ Not recommended — unfavorable session time."
    };

    format!(
        "{arrow} {pair} | {timeframe}m | {dir}\n\
         Price: {price:.5} | Confirmations: {conf}/{total} | Win rate: {rate}\n\
         ⏱️ Recommended: {hold} (for {timeframe}–{next} minutes)\n\
         🎯 Entry price: {price:.5}\n\
         🕒 Signal time: {time}\n\
         \n\
         Analysis: {comment}{otc_note}{session_note}",
        arrow = signal.direction.arrow(),
        dir = signal.direction.as_str(),
        conf = signal.confirmations,
        total = CONDITION_COUNT,
        rate = rates.rate(pair, timeframe),
        next = timeframe + 1,
        time = session.local_time(now),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::PLACEHOLDER_RATE;
    use chrono::TimeZone;

    fn fixtures() -> (WinRateTable, SessionPolicy, SignalResult) {
        (
            WinRateTable::rebuild(&[]),
            SessionPolicy::new("Europe/Warsaw".parse().unwrap()),
            SignalResult {
                direction: Direction::Buy,
                confirmations: 4,
                trend_strength: 27.5,
            },
        )
    }

    // Wednesday 10:00 Warsaw, inside a recommended window.
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 8, 0, 0).unwrap()
    }

    #[test]
    fn cooldown_suppresses_the_second_candidate() {
        let (rates, session, signal) = fixtures();
        let mut gate = AlertGate::new(120);

        let first = gate.consider("EURUSD", 5, &signal, 1.1, t0(), &rates, &session);
        assert!(first.is_some());

        let t1 = t0() + Duration::seconds(60);
        assert!(gate.consider("EURUSD", 5, &signal, 1.1, t1, &rates, &session).is_none());
        // Exactly at the boundary the window is still closed.
        let t2 = t0() + Duration::seconds(120);
        assert!(gate.consider("EURUSD", 5, &signal, 1.1, t2, &rates, &session).is_none());
        // One second past the window it re-arms.
        let t3 = t0() + Duration::seconds(121);
        assert!(gate.consider("EURUSD", 5, &signal, 1.1, t3, &rates, &session).is_some());
    }

    #[test]
    fn cooldown_is_tracked_per_pair() {
        let (rates, session, signal) = fixtures();
        let mut gate = AlertGate::new(120);
        assert!(gate.consider("EURUSD", 5, &signal, 1.1, t0(), &rates, &session).is_some());
        assert!(gate.consider("GBPUSD", 5, &signal, 1.3, t0(), &rates, &session).is_some());
    }

    #[test]
    fn message_carries_counts_rate_and_otc_note() {
        let (rates, session, signal) = fixtures();
        let mut gate = AlertGate::new(120);

        let (msg, record) = gate
            .consider("EURUSD_OTC", 5, &signal, 1.10234, t0(), &rates, &session)
            .unwrap();
        assert!(msg.contains("🔺 EURUSD_OTC | 5m | BUY"));
        assert!(msg.contains("Confirmations: 4/5"));
        assert!(msg.contains(PLACEHOLDER_RATE));
        assert!(msg.contains("1.10234"));
        assert!(msg.contains("for 5–6 minutes"));
        assert!(msg.contains("*OTC*"));
        assert!(!msg.contains("unfavorable session"));
        assert!(record.favorable);
        assert_eq!(record.direction, Direction::Buy);
    }

    #[test]
    fn bad_session_marks_the_record_unfavorable() {
        let (rates, session, signal) = fixtures();
        let mut gate = AlertGate::new(120);
        // Saturday.
        let t = Utc.with_ymd_and_hms(2025, 6, 14, 8, 0, 0).unwrap();
        let (msg, record) = gate
            .consider("EURUSD", 5, &signal, 1.1, t, &rates, &session)
            .unwrap();
        assert!(msg.contains("unfavorable session"));
        assert!(!record.favorable);
    }
}
