// Forex news polling.
//
// The Finnhub REST news feed is polled on an interval; whenever the set of
// recent article ids changes, the change instant is published on a watch
// channel. The stream side holds back alerts while a change is fresh.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    datetime: i64,
}

/// Ids of the items published within the trailing window, sorted so two
/// snapshots compare as sets.
fn recent_ids(items: &[NewsItem], now: DateTime<Utc>, window: Duration) -> Vec<i64> {
    let cutoff = (now - window).timestamp();
    let mut ids: Vec<i64> = items
        .iter()
        .filter(|i| i.datetime >= cutoff)
        .map(|i| i.id)
        .collect();
    ids.sort_unstable();
    ids
}

pub struct NewsMonitor {
    client: reqwest::Client,
    url: String,
    window: Duration,
    cache: Vec<i64>,
    primed: bool,
}

impl NewsMonitor {
    pub fn new(api_key: &str, window_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("https://finnhub.io/api/v1/news?category=forex&token={api_key}"),
            window: Duration::seconds(window_secs as i64),
            cache: Vec::new(),
            primed: false,
        }
    }

    /// Fold one feed snapshot into the cached set and report whether it
    /// changed. The first snapshot only primes the cache: the cache starts
    /// empty, and reporting that first difference would open every startup
    /// inside a hold whenever any recent news exists.
    fn observe(&mut self, items: &[NewsItem], now: DateTime<Utc>) -> bool {
        let recent = recent_ids(items, now, self.window);
        let changed = self.primed && recent != self.cache;
        self.cache = recent;
        self.primed = true;
        changed
    }

    /// Fetch the feed and report whether the set of articles inside the
    /// recency window changed since the previous poll.
    pub async fn poll(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let items: Vec<NewsItem> = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("requesting forex news feed")?
            .error_for_status()
            .context("forex news feed status")?
            .json()
            .await
            .context("decoding forex news feed")?;
        Ok(self.observe(&items, now))
    }
}

/// Poll forever, publishing the instant of each detected change. Fetch
/// errors are logged and treated as "no change".
pub fn spawn(
    mut monitor: NewsMonitor,
    interval_secs: u64,
    tx: watch::Sender<Option<DateTime<Utc>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let now = Utc::now();
            match monitor.poll(now).await {
                Ok(true) => {
                    info!("NEWS: feed changed, holding alerts");
                    let _ = tx.send(Some(now));
                }
                Ok(false) => debug!("NEWS: no change"),
                Err(e) => warn!("NEWS: poll failed: {e:#}"),
            }
        }
    })
}
