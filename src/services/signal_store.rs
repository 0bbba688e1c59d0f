//! SQLite persistence for generated signals and favorite pairs.
//!
//! Signals survive restarts so the tracker can keep resolving them
//! against live prices. Lifecycle writes go through `close`, which only
//! ever moves a row from OPEN to one terminal status.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::types::{
    Direction, FavoritePair, SignalRecord, SignalStats, SignalStatus, TradingStyle,
};
use crate::util;

/// SQLite store for signal records.
pub struct SignalStore {
    conn: Mutex<Connection>,
}

impl SignalStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("Signal store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory signal store initialized");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS signals (
                id TEXT PRIMARY KEY,
                pair TEXT NOT NULL,
                style TEXT NOT NULL,
                direction TEXT NOT NULL,
                entry REAL NOT NULL,
                stop_loss REAL NOT NULL,
                take_profit REAL NOT NULL,
                confidence REAL NOT NULL,
                confluence_count INTEGER NOT NULL,
                divergence INTEGER NOT NULL DEFAULT 0,
                reason TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'OPEN',
                created_at INTEGER NOT NULL,
                closed_at INTEGER,
                exit_price REAL,
                pnl_percent REAL,
                duration_minutes INTEGER,
                highest_price REAL,
                lowest_price REAL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signals_pair ON signals(pair)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signals_status ON signals(status)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signals_created ON signals(created_at DESC)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS favorite_pairs (
                pair TEXT PRIMARY KEY,
                added_at INTEGER NOT NULL
            )",
            [],
        )?;

        debug!("Signal store schema initialized");
        Ok(())
    }

    // ========== Signal Methods ==========

    /// Persist a new signal record.
    pub fn insert(&self, record: &SignalRecord) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO signals
             (id, pair, style, direction, entry, stop_loss, take_profit, confidence,
              confluence_count, divergence, reason, status, created_at, closed_at,
              exit_price, pnl_percent, duration_minutes, highest_price, lowest_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                record.id.to_string(),
                record.pair,
                record.style.name().to_lowercase(),
                record.direction.label(),
                record.entry,
                record.stop_loss,
                record.take_profit,
                record.confidence,
                record.confluence_count,
                record.divergence as i64,
                record.reason,
                record.status.as_str(),
                record.created_at,
                record.closed_at,
                record.exit_price,
                record.pnl_percent,
                record.duration_minutes,
                record.highest_price,
                record.lowest_price,
            ],
        )?;

        debug!("Stored {} signal {} for {}", record.direction.label(), record.id, record.pair);
        Ok(())
    }

    /// Fetch one signal by ID.
    pub fn get(&self, id: &Uuid) -> Option<SignalRecord> {
        let conn = self.conn.lock().unwrap();

        let result = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_SIGNAL),
                params![id.to_string()],
                map_signal_row,
            )
            .optional();

        match result {
            Ok(record) => record,
            Err(e) => {
                error!("Error fetching signal {}: {}", id, e);
                None
            }
        }
    }

    /// List signals, newest first, optionally filtered by pair and/or
    /// status.
    pub fn list(
        &self,
        pair: Option<&str>,
        status: Option<SignalStatus>,
        limit: usize,
    ) -> Vec<SignalRecord> {
        let conn = self.conn.lock().unwrap();

        let (query, pair_filter): (String, Option<String>) = match (pair, status) {
            (Some(p), Some(s)) => (
                format!(
                    "{} WHERE pair = ?1 AND status = '{}' ORDER BY created_at DESC LIMIT ?2",
                    SELECT_SIGNAL,
                    s.as_str()
                ),
                Some(p.to_uppercase()),
            ),
            (Some(p), None) => (
                format!(
                    "{} WHERE pair = ?1 ORDER BY created_at DESC LIMIT ?2",
                    SELECT_SIGNAL
                ),
                Some(p.to_uppercase()),
            ),
            (None, Some(s)) => (
                format!(
                    "{} WHERE status = '{}' ORDER BY created_at DESC LIMIT ?1",
                    SELECT_SIGNAL,
                    s.as_str()
                ),
                None,
            ),
            (None, None) => (
                format!("{} ORDER BY created_at DESC LIMIT ?1", SELECT_SIGNAL),
                None,
            ),
        };

        let mut stmt = match conn.prepare(&query) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!("Error preparing signal list query: {}", e);
                return Vec::new();
            }
        };

        let rows = match pair_filter {
            Some(p) => stmt.query_map(params![p, limit as i64], map_signal_row),
            None => stmt.query_map(params![limit as i64], map_signal_row),
        };

        rows.map(|r| r.filter_map(|row| row.ok()).collect())
            .unwrap_or_default()
    }

    /// All currently open signals, oldest first so the tracker resolves
    /// them in creation order.
    pub fn list_open(&self) -> Vec<SignalRecord> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = match conn.prepare(&format!(
            "{} WHERE status = 'OPEN' ORDER BY created_at ASC",
            SELECT_SIGNAL
        )) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!("Error preparing open signal query: {}", e);
                return Vec::new();
            }
        };

        stmt.query_map([], map_signal_row)
            .map(|r| r.filter_map(|row| row.ok()).collect())
            .unwrap_or_default()
    }

    /// Close an open signal into a terminal status.
    ///
    /// Only a row still in OPEN transitions; a second close of the same
    /// signal is a no-op returning None. Realized pnl is derived from
    /// the exit price when one is given.
    pub fn close(
        &self,
        id: &Uuid,
        status: SignalStatus,
        exit_price: Option<f64>,
    ) -> Result<Option<SignalRecord>, rusqlite::Error> {
        if !status.is_terminal() {
            return Ok(None);
        }

        let existing = match self.get(id) {
            Some(record) => record,
            None => return Ok(None),
        };

        let now = Utc::now().timestamp_millis();
        let pnl = exit_price.map(|exit| util::pnl_percent(existing.entry, exit, existing.direction));
        let duration_minutes = (now - existing.created_at) / 60_000;

        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE signals
             SET status = ?2, closed_at = ?3, exit_price = ?4, pnl_percent = ?5,
                 duration_minutes = ?6
             WHERE id = ?1 AND status = 'OPEN'",
            params![
                id.to_string(),
                status.as_str(),
                now,
                exit_price,
                pnl,
                duration_minutes,
            ],
        )?;
        drop(conn);

        if updated == 0 {
            return Ok(None);
        }

        debug!("Closed signal {} as {}", id, status.as_str());
        Ok(self.get(id))
    }

    /// Record the extreme prices seen while a signal is open.
    pub fn touch_extremes(&self, id: &Uuid, price: f64) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE signals
             SET highest_price = MAX(COALESCE(highest_price, ?2), ?2),
                 lowest_price = MIN(COALESCE(lowest_price, ?2), ?2)
             WHERE id = ?1 AND status = 'OPEN'",
            params![id.to_string(), price],
        )?;
        Ok(())
    }

    /// Delete a signal outright.
    pub fn delete(&self, id: &Uuid) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM signals WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Aggregate lifecycle statistics across all stored signals.
    pub fn stats(&self) -> SignalStats {
        let conn = self.conn.lock().unwrap();

        let counts = conn.query_row(
            "SELECT
                COUNT(*),
                SUM(CASE WHEN status = 'OPEN' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'HIT_TP' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'HIT_SL' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'EXPIRED' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'CANCELLED' THEN 1 ELSE 0 END)
             FROM signals",
            [],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, Option<u32>>(1)?.unwrap_or(0),
                    row.get::<_, Option<u32>>(2)?.unwrap_or(0),
                    row.get::<_, Option<u32>>(3)?.unwrap_or(0),
                    row.get::<_, Option<u32>>(4)?.unwrap_or(0),
                    row.get::<_, Option<u32>>(5)?.unwrap_or(0),
                ))
            },
        );
        let (total, open, hit_tp, hit_sl, expired, cancelled) = match counts {
            Ok(c) => c,
            Err(e) => {
                error!("Error computing signal stats: {}", e);
                return SignalStats::default();
            }
        };

        let pnl = conn.query_row(
            "SELECT AVG(pnl_percent), MAX(pnl_percent), MIN(pnl_percent)
             FROM signals WHERE pnl_percent IS NOT NULL",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<f64>>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        );
        let (avg_pnl, best_pnl, worst_pnl) = match pnl {
            Ok(p) => p,
            Err(e) => {
                error!("Error computing pnl stats: {}", e);
                (None, None, None)
            }
        };

        let decided = hit_tp + hit_sl;
        let win_rate = if decided > 0 {
            hit_tp as f64 / decided as f64 * 100.0
        } else {
            0.0
        };

        SignalStats {
            total,
            open,
            hit_tp,
            hit_sl,
            expired,
            cancelled,
            win_rate,
            avg_pnl_percent: avg_pnl.unwrap_or(0.0),
            best_pnl_percent: best_pnl.unwrap_or(0.0),
            worst_pnl_percent: worst_pnl.unwrap_or(0.0),
        }
    }

    // ========== Favorite Pairs ==========

    /// Pin a pair. Re-adding an existing favorite is a no-op.
    pub fn add_favorite(&self, pair: &str) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO favorite_pairs (pair, added_at) VALUES (?1, ?2)",
            params![pair.to_uppercase(), Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// Unpin a pair.
    pub fn remove_favorite(&self, pair: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM favorite_pairs WHERE pair = ?1",
            params![pair.to_uppercase()],
        )?;
        Ok(removed > 0)
    }

    /// All pinned pairs, in pin order.
    pub fn list_favorites(&self) -> Vec<FavoritePair> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = match conn
            .prepare("SELECT pair, added_at FROM favorite_pairs ORDER BY added_at ASC")
        {
            Ok(stmt) => stmt,
            Err(e) => {
                error!("Error preparing favorites query: {}", e);
                return Vec::new();
            }
        };

        stmt.query_map([], |row| {
            Ok(FavoritePair {
                pair: row.get(0)?,
                added_at: row.get(1)?,
            })
        })
        .map(|r| r.filter_map(|row| row.ok()).collect())
        .unwrap_or_default()
    }
}

const SELECT_SIGNAL: &str = "SELECT id, pair, style, direction, entry, stop_loss, take_profit,
        confidence, confluence_count, divergence, reason, status, created_at,
        closed_at, exit_price, pnl_percent, duration_minutes, highest_price,
        lowest_price
 FROM signals";

fn map_signal_row(row: &rusqlite::Row<'_>) -> Result<SignalRecord, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let style_str: String = row.get(2)?;
    let direction_str: String = row.get(3)?;
    let status_str: String = row.get(11)?;

    Ok(SignalRecord {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
        pair: row.get(1)?,
        style: TradingStyle::from_str(&style_str).unwrap_or_default(),
        direction: Direction::from_str(&direction_str).unwrap_or(Direction::Buy),
        entry: row.get(4)?,
        stop_loss: row.get(5)?,
        take_profit: row.get(6)?,
        confidence: row.get(7)?,
        confluence_count: row.get(8)?,
        divergence: row.get::<_, i64>(9)? != 0,
        reason: row.get(10)?,
        status: SignalStatus::from_str(&status_str).unwrap_or(SignalStatus::Open),
        created_at: row.get(12)?,
        closed_at: row.get(13)?,
        exit_price: row.get(14)?,
        pnl_percent: row.get(15)?,
        duration_minutes: row.get(16)?,
        highest_price: row.get(17)?,
        lowest_price: row.get(18)?,
    })
}
