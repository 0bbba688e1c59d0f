pub mod datasets;
pub mod signal_store;
pub mod tracker;

pub use datasets::{parse_csv, DatasetFolder, DatasetStore};
pub use signal_store::SignalStore;
pub use tracker::{SignalTracker, TrackerSummary};
