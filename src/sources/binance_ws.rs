use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::services::{SignalStore, SignalTracker};

const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/stream";
const RECONNECT_DELAY_SECS: u64 = 5;
const RESYNC_INTERVAL_SECS: u64 = 30;

/// Binance stream subscription command.
#[derive(Debug, Serialize)]
struct StreamCommand {
    method: String,
    params: Vec<String>,
    id: u64,
}

/// Envelope around combined-stream payloads.
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[allow(dead_code)]
    stream: Option<String>,
    data: Option<MiniTicker>,
}

/// Binance miniTicker payload (single-letter field names on the wire).
#[derive(Debug, Deserialize)]
struct MiniTicker {
    #[serde(rename = "e")]
    event: Option<String>,
    #[serde(rename = "s")]
    symbol: Option<String>,
    #[serde(rename = "c")]
    close: Option<String>,
}

/// Binance WebSocket client feeding live prices to the tracker.
///
/// Streams miniTicker updates for every pair the tracker cares about:
/// favorites plus pairs with open signals. The subscription set is
/// re-derived from the store periodically so new signals start
/// streaming without a restart.
#[derive(Clone)]
pub struct BinanceWs {
    store: Arc<SignalStore>,
    tracker: Arc<SignalTracker>,
    subscribed: Arc<RwLock<HashSet<String>>>,
}

impl BinanceWs {
    /// Create a new Binance WebSocket client.
    pub fn new(store: Arc<SignalStore>, tracker: Arc<SignalTracker>) -> Self {
        Self {
            store,
            tracker,
            subscribed: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Connect and keep streaming prices, reconnecting on failure.
    pub async fn connect(&self) {
        loop {
            let streams = self.desired_streams();
            if streams.is_empty() {
                debug!("No pairs to stream, checking again later");
                tokio::time::sleep(Duration::from_secs(RESYNC_INTERVAL_SECS)).await;
                continue;
            }

            match self.run_connection(streams).await {
                Ok(_) => {
                    warn!("Binance WebSocket disconnected, reconnecting...");
                }
                Err(e) => {
                    error!("Binance WebSocket error: {}, reconnecting...", e);
                }
            }
            tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
        }
    }

    /// Pairs worth streaming: favorites plus open-signal pairs.
    fn desired_streams(&self) -> HashSet<String> {
        let mut pairs: HashSet<String> = HashSet::new();
        for favorite in self.store.list_favorites() {
            pairs.insert(favorite.pair);
        }
        for signal in self.store.list_open() {
            pairs.insert(signal.pair);
        }
        pairs
            .into_iter()
            .map(|p| format!("{}@miniTicker", p.to_lowercase()))
            .collect()
    }

    async fn run_connection(&self, initial: HashSet<String>) -> anyhow::Result<()> {
        let mut ordered: Vec<&str> = initial.iter().map(String::as_str).collect();
        ordered.sort_unstable();
        let url = format!("{}?streams={}", BINANCE_WS_URL, ordered.join("/"));

        info!("Connecting to Binance WebSocket ({} streams)", initial.len());
        let (ws_stream, _) = connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();
        info!("Connected to Binance WebSocket");

        {
            let mut subscribed = self.subscribed.write().await;
            subscribed.clear();
            subscribed.extend(initial);
        }

        let mut next_command_id: u64 = 1;
        let mut resync = tokio::time::interval(Duration::from_secs(RESYNC_INTERVAL_SECS));
        resync.tick().await;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_message(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("Binance WebSocket closed");
                            break;
                        }
                        Some(Err(e)) => {
                            error!("Binance WebSocket read error: {}", e);
                            break;
                        }
                        None => {
                            break;
                        }
                        _ => {}
                    }
                }
                _ = resync.tick() => {
                    let desired = self.desired_streams();
                    let current = self.subscribed.read().await.clone();

                    let added: Vec<String> = desired.difference(&current).cloned().collect();
                    let removed: Vec<String> = current.difference(&desired).cloned().collect();

                    if !added.is_empty() {
                        let command = StreamCommand {
                            method: "SUBSCRIBE".to_string(),
                            params: added.clone(),
                            id: next_command_id,
                        };
                        next_command_id += 1;
                        if let Ok(json) = serde_json::to_string(&command) {
                            let _ = write.send(Message::Text(json)).await;
                            let mut subscribed = self.subscribed.write().await;
                            subscribed.extend(added);
                        }
                    }

                    if !removed.is_empty() {
                        let command = StreamCommand {
                            method: "UNSUBSCRIBE".to_string(),
                            params: removed.clone(),
                            id: next_command_id,
                        };
                        next_command_id += 1;
                        if let Ok(json) = serde_json::to_string(&command) {
                            let _ = write.send(Message::Text(json)).await;
                            let mut subscribed = self.subscribed.write().await;
                            for stream in &removed {
                                subscribed.remove(stream);
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_message(&self, text: &str) {
        let envelope: StreamEnvelope = match serde_json::from_str(text) {
            Ok(e) => e,
            Err(_) => return,
        };

        // Subscription acks and other control frames carry no data.
        let ticker = match envelope.data {
            Some(t) => t,
            None => return,
        };

        if ticker.event.as_deref() != Some("24hrMiniTicker") {
            return;
        }

        let symbol = match ticker.symbol {
            Some(s) => s,
            None => return,
        };

        let price: f64 = match ticker.close.and_then(|c| c.parse().ok()) {
            Some(p) => p,
            None => return,
        };

        debug!("Binance price update: {} = {}", symbol, price);
        self.tracker.update_price(&symbol, price);
    }
}
