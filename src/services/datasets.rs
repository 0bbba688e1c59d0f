//! Folder-based CSV dataset storage.
//!
//! Datasets live under a single root directory, one folder per
//! collection, one CSV file per chunk. Loading a folder concatenates
//! its files in name order and normalizes the combined series.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::types::{normalize_series, parse_open_time, Candle};

/// A dataset folder and how many CSV files it holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFolder {
    pub name: String,
    pub file_count: usize,
}

/// Filesystem-backed store of candle datasets.
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    /// Open the store rooted at the given directory, creating it if needed.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!("Dataset store rooted at {}", root.display());
        Ok(Self { root })
    }

    /// List folders sorted by name.
    pub fn list_folders(&self) -> Result<Vec<DatasetFolder>> {
        let mut folders = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_count = self.list_files(&name)?.len();
            folders.push(DatasetFolder { name, file_count });
        }
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    /// Create a folder. Creating an existing folder is a no-op.
    pub fn create_folder(&self, folder: &str) -> Result<()> {
        let path = self.folder_path(folder)?;
        fs::create_dir_all(&path)?;
        info!("Created dataset folder {}", folder);
        Ok(())
    }

    /// Delete a folder and everything in it.
    pub fn delete_folder(&self, folder: &str) -> Result<()> {
        let path = self.folder_path(folder)?;
        if !path.is_dir() {
            return Err(AppError::NotFound(format!(
                "dataset folder not found: {}",
                folder
            )));
        }
        fs::remove_dir_all(&path)?;
        info!("Deleted dataset folder {}", folder);
        Ok(())
    }

    /// List the CSV files in a folder, sorted by name.
    pub fn list_files(&self, folder: &str) -> Result<Vec<String>> {
        let path = self.folder_path(folder)?;
        if !path.is_dir() {
            return Err(AppError::NotFound(format!(
                "dataset folder not found: {}",
                folder
            )));
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && name.to_ascii_lowercase().ends_with(".csv") {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Save uploaded CSV text into a folder. The content is parsed first
    /// so malformed uploads are rejected before anything hits disk.
    pub fn save_csv(&self, folder: &str, file: &str, contents: &str) -> Result<usize> {
        let path = self.folder_path(folder)?;
        if !path.is_dir() {
            return Err(AppError::NotFound(format!(
                "dataset folder not found: {}",
                folder
            )));
        }
        let file = validated_file_name(file)?;
        let candles = parse_csv(contents)?;
        fs::write(path.join(&file), contents)?;
        info!("Saved {} rows to {}/{}", candles.len(), folder, file);
        Ok(candles.len())
    }

    /// Delete a single file from a folder.
    pub fn delete_file(&self, folder: &str, file: &str) -> Result<()> {
        let path = self.folder_path(folder)?;
        let file = validated_file_name(file)?;
        let target = path.join(&file);
        if !target.is_file() {
            return Err(AppError::NotFound(format!(
                "dataset file not found: {}/{}",
                folder, file
            )));
        }
        fs::remove_file(target)?;
        info!("Deleted dataset file {}/{}", folder, file);
        Ok(())
    }

    /// Load one CSV file as a candle series.
    pub fn load_file(&self, folder: &str, file: &str) -> Result<Vec<Candle>> {
        let path = self.folder_path(folder)?;
        let file = validated_file_name(file)?;
        let target = path.join(&file);
        if !target.is_file() {
            return Err(AppError::NotFound(format!(
                "dataset file not found: {}/{}",
                folder, file
            )));
        }
        let text = fs::read_to_string(target)?;
        parse_csv(&text)
    }

    /// Load every CSV in a folder in name order, concatenated into one
    /// sorted, deduplicated series.
    pub fn load_folder(&self, folder: &str) -> Result<Vec<Candle>> {
        let files = self.list_files(folder)?;
        if files.is_empty() {
            return Err(AppError::BadRequest(format!(
                "dataset folder is empty: {}",
                folder
            )));
        }
        let mut combined = Vec::new();
        for file in &files {
            let mut candles = self.load_file(folder, file)?;
            debug!("Loaded {} rows from {}/{}", candles.len(), folder, file);
            combined.append(&mut candles);
        }
        Ok(normalize_series(combined))
    }

    fn folder_path(&self, folder: &str) -> Result<PathBuf> {
        if !is_valid_name(folder) {
            return Err(AppError::BadRequest(format!(
                "invalid folder name: {}",
                folder
            )));
        }
        Ok(self.root.join(folder))
    }
}

/// Folder names are restricted to alphanumerics, '-' and '_' so they can
/// never escape the dataset root.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validated_file_name(file: &str) -> Result<String> {
    let stem = file
        .strip_suffix(".csv")
        .or_else(|| file.strip_suffix(".CSV"))
        .unwrap_or(file);
    if !is_valid_name(stem) {
        return Err(AppError::BadRequest(format!("invalid file name: {}", file)));
    }
    Ok(format!("{}.csv", stem))
}

const REQUIRED_COLUMNS: [&str; 6] = ["open_time", "open", "high", "low", "close", "volume"];

/// Parse CSV text into candles.
///
/// Requires open_time, open, high, low, close and volume columns (any
/// order, extra columns ignored). open_time accepts epoch milliseconds
/// or ISO-8601 text.
pub fn parse_csv(text: &str) -> Result<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("unreadable CSV header: {}", e)))?
        .clone();

    let mut positions = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::BadRequest(format!("CSV is missing the {} column", name)))?;
    }
    let [time_at, open_at, high_at, low_at, close_at, volume_at] = positions;

    let mut candles = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let line = row + 2;
        let record =
            record.map_err(|e| AppError::BadRequest(format!("CSV row {}: {}", line, e)))?;

        let raw_time = field(&record, time_at, "open_time", line)?;
        let open_time = parse_open_time(raw_time)
            .map_err(|e| AppError::BadRequest(format!("CSV row {}: {}", line, e)))?;

        candles.push(Candle {
            open_time,
            open: numeric(&record, open_at, "open", line)?,
            high: numeric(&record, high_at, "high", line)?,
            low: numeric(&record, low_at, "low", line)?,
            close: numeric(&record, close_at, "close", line)?,
            volume: numeric(&record, volume_at, "volume", line)?,
        });
    }
    Ok(candles)
}

fn field<'a>(
    record: &'a csv::StringRecord,
    at: usize,
    name: &str,
    line: usize,
) -> Result<&'a str> {
    record.get(at).ok_or_else(|| {
        AppError::BadRequest(format!("CSV row {}: missing {} value", line, name))
    })
}

fn numeric(record: &csv::StringRecord, at: usize, name: &str, line: usize) -> Result<f64> {
    let raw = field(record, at, name, line)?;
    raw.parse::<f64>().map_err(|_| {
        AppError::BadRequest(format!(
            "CSV row {}: unparseable {} value: {}",
            line, name, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SAMPLE: &str = "\
open_time,open,high,low,close,volume
1700000000000,100.0,101.0,99.0,100.5,1200
1700000060000,100.5,102.0,100.0,101.5,900
";

    fn temp_store() -> (DatasetStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("candor-datasets-{}", Uuid::new_v4()));
        let store = DatasetStore::new(&root).unwrap();
        (store, root)
    }

    #[test]
    fn test_parse_csv_epoch_millis() {
        let candles = parse_csv(SAMPLE).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(candles[1].close, 101.5);
    }

    #[test]
    fn test_parse_csv_iso_time_and_column_order() {
        let text = "\
volume,close,low,high,open,open_time
10,101.0,99.0,102.0,100.0,2024-01-01T00:00:00Z
";
        let candles = parse_csv(text).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].volume, 10.0);
        assert_eq!(candles[0].open_time.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_parse_csv_missing_column_names_it() {
        let text = "open_time,open,high,low,close\n1,1,1,1,1\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_parse_csv_bad_number_names_field() {
        let text = "\
open_time,open,high,low,close,volume
1700000000000,abc,101.0,99.0,100.5,1200
";
        let err = parse_csv(text).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("open"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_folder_lifecycle() {
        let (store, root) = temp_store();

        store.create_folder("btc-1h").unwrap();
        store.save_csv("btc-1h", "part-a", SAMPLE).unwrap();
        assert_eq!(store.list_files("btc-1h").unwrap(), vec!["part-a.csv"]);

        let folders = store.list_folders().unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "btc-1h");
        assert_eq!(folders[0].file_count, 1);

        store.delete_folder("btc-1h").unwrap();
        assert!(store.list_folders().unwrap().is_empty());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (store, root) = temp_store();

        assert!(matches!(
            store.create_folder("../escape"),
            Err(AppError::BadRequest(_))
        ));
        store.create_folder("ok").unwrap();
        assert!(matches!(
            store.save_csv("ok", "../../etc/passwd", SAMPLE),
            Err(AppError::BadRequest(_))
        ));

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_save_rejects_malformed_csv() {
        let (store, root) = temp_store();

        store.create_folder("data").unwrap();
        let err = store
            .save_csv("data", "bad", "open_time,open\n1,2\n")
            .unwrap_err();
        assert!(err.to_string().contains("high"));
        assert!(store.list_files("data").unwrap().is_empty());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_load_folder_merges_and_sorts() {
        let (store, root) = temp_store();
        store.create_folder("merged").unwrap();

        // Later chunk first by name; includes a duplicate of 1700000060000.
        let part_b = "\
open_time,open,high,low,close,volume
1700000060000,100.6,102.1,100.1,101.6,950
1700000120000,101.6,103.0,101.0,102.5,800
";
        store.save_csv("merged", "a-part", SAMPLE).unwrap();
        store.save_csv("merged", "b-part", part_b).unwrap();

        let candles = store.load_folder("merged").unwrap();
        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
        // Duplicate timestamp keeps the later file's row.
        assert_eq!(candles[1].close, 101.6);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_load_empty_folder_is_bad_request() {
        let (store, root) = temp_store();
        store.create_folder("empty").unwrap();
        assert!(matches!(
            store.load_folder("empty"),
            Err(AppError::BadRequest(_))
        ));
        let _ = fs::remove_dir_all(root);
    }
}
