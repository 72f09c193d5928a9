// Trading-session policy in exchange-local time.
//
// Session quality is advisory: alerts outside the recommended windows are
// still sent, only labeled. The windows follow the London / London+NY
// overlap / US evening rhythm.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    tz: Tz,
}

impl SessionPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Whether `now` falls inside a recommended trading window. Mondays
    /// before noon, Fridays from 17:00, and weekends are always bad.
    pub fn is_good_time(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        let hour = local.hour();
        match local.weekday() {
            Weekday::Mon if hour < 12 => return false,
            Weekday::Fri if hour >= 17 => return false,
            Weekday::Sat | Weekday::Sun => return false,
            _ => {}
        }
        (9..=12).contains(&hour) || (14..=17).contains(&hour) || (20..=22).contains(&hour)
    }

    pub fn period_name(&self, now: DateTime<Utc>) -> &'static str {
        let hour = now.with_timezone(&self.tz).hour();
        match hour {
            9..=11 => "MORNING (London session)",
            14..=16 => "AFTERNOON (Europe + early US)",
            20..=21 => "EVENING (US session)",
            _ => "OUTSIDE active zones — ⚠️ the market may be sluggish",
        }
    }

    pub fn schedule_message(&self) -> String {
        "📅 *Recommended trading hours:*\n\n\
         🟢 09:00 – 12:00 (exchange time) — London opens\n\
         🟢 14:00 – 17:00 — London / New York overlap\n\
         🟢 20:00 – 22:00 — US session\n\
         ⛔ Monday before 12:00 — the market is waking up\n\
         ⛔ Friday after 17:00 — volatility fades\n\
         ⛔ Weekends — market closed\n"
            .to_string()
    }

    /// Local wall-clock time, HH:MM:SS.
    pub fn local_time(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz).format("%H:%M:%S").to_string()
    }

    /// Local wall-clock time, HH:MM.
    pub fn local_time_short(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz).format("%H:%M").to_string()
    }
}
