// Telegram delivery over a bounded queue.
//
// Producers hand messages to a channel and never wait on the network; one
// worker task drains the queue in order. When the queue is full the message
// is dropped with a warning rather than blocking tick processing.

use log::warn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<String>,
}

impl Notifier {
    pub fn new(bot_token: &str, chat_id: &str, queue_size: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<String>(queue_size);
        let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
        let chat_id = chat_id.to_string();
        let worker = tokio::spawn(async move {
            let client = reqwest::Client::new();
            while let Some(text) = rx.recv().await {
                let form = [
                    ("chat_id", chat_id.as_str()),
                    ("text", text.as_str()),
                    ("parse_mode", "Markdown"),
                ];
                match client.post(&url).form(&form).send().await {
                    Ok(resp) if !resp.status().is_success() => {
                        warn!("NOTIFY: telegram returned {}", resp.status());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("NOTIFY: send failed: {e}"),
                }
            }
        });
        (Self { tx }, worker)
    }

    /// Enqueue without waiting; a full queue drops the message.
    pub fn send(&self, text: String) {
        if let Err(e) = self.tx.try_send(text) {
            warn!("NOTIFY: queue full, dropping message: {e}");
        }
    }
}
