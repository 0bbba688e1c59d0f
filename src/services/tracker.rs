//! Live signal tracking.
//!
//! Keeps the latest traded price per pair and periodically sweeps open
//! signals: crossing a level closes the signal at the observed price,
//! and signals past their style's lifetime expire. All transitions go
//! through the store's single OPEN-to-terminal close, so a sweep racing
//! a manual cancel can never double-close a signal.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::services::SignalStore;
use crate::types::SignalStatus;

/// Tracker state exposed to the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSummary {
    /// Signals currently being watched.
    pub open_signals: usize,
    /// Pairs with at least one price observation.
    pub tracked_pairs: usize,
    /// Unix millis of the last completed sweep.
    pub last_sweep: Option<i64>,
}

/// Watches open signals against live prices.
pub struct SignalTracker {
    store: Arc<SignalStore>,
    prices: DashMap<String, f64>,
    sweep_interval: Duration,
    last_sweep: AtomicI64,
}

impl SignalTracker {
    pub fn new(store: Arc<SignalStore>, sweep_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            store,
            prices: DashMap::new(),
            sweep_interval,
            last_sweep: AtomicI64::new(0),
        })
    }

    /// Ingest a price observation for a pair.
    pub fn update_price(&self, pair: &str, price: f64) {
        self.prices.insert(pair.to_uppercase(), price);
    }

    /// Latest observed price for a pair.
    pub fn price(&self, pair: &str) -> Option<f64> {
        self.prices.get(&pair.to_uppercase()).map(|entry| *entry)
    }

    /// One pass over all open signals: extremes, crossings, expiries.
    pub fn sweep(&self) {
        let open = self.store.list_open();
        let now = Utc::now().timestamp_millis();

        for record in open {
            let price = self.price(&record.pair);

            if let Some(price) = price {
                if let Err(e) = self.store.touch_extremes(&record.id, price) {
                    warn!("Failed to update extremes for {}: {}", record.id, e);
                }

                if let Some(outcome) = record.crossing(price) {
                    let status = SignalStatus::from(outcome);
                    match self.store.close(&record.id, status, Some(price)) {
                        Ok(Some(closed)) => {
                            info!(
                                "{} {} {} at {} | PnL {:+.2}%",
                                closed.pair,
                                closed.direction.label(),
                                status.as_str(),
                                price,
                                closed.pnl_percent.unwrap_or(0.0)
                            );
                        }
                        Ok(None) => {}
                        Err(e) => error!("Failed to close signal {}: {}", record.id, e),
                    }
                    continue;
                }
            }

            let age_hours = (now - record.created_at) / 3_600_000;
            if age_hours >= record.style.expiry_hours() {
                match self.store.close(&record.id, SignalStatus::Expired, price) {
                    Ok(Some(_)) => info!("{} signal {} expired", record.pair, record.id),
                    Ok(None) => {}
                    Err(e) => error!("Failed to expire signal {}: {}", record.id, e),
                }
            }
        }

        self.last_sweep.store(now, Ordering::Relaxed);
    }

    /// Current tracker state for the status endpoint.
    pub fn summary(&self) -> TrackerSummary {
        let last = self.last_sweep.load(Ordering::Relaxed);
        TrackerSummary {
            open_signals: self.store.list_open().len(),
            tracked_pairs: self.prices.len(),
            last_sweep: (last > 0).then_some(last),
        }
    }

    /// Sweep forever at the configured interval. Spawned from main.
    pub async fn run(self: Arc<Self>) {
        info!(
            "Signal tracker running, sweep every {}s",
            self.sweep_interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.sweep_interval);
        loop {
            ticker.tick().await;
            self.sweep();
        }
    }
}
