mod backup;
mod clock;
mod export;
mod locations;
mod record;
mod store;
mod trend;

pub use clock::*;
pub use export::*;
pub use record::*;
pub use store::*;
pub use trend::*;

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("History storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to read or write history log: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to read or write saved locations: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to format time string: {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("Failed to write parquet export: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Failed to write spreadsheet export: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Failed to prune history, log left unchanged: {0}")]
    PruneFailed(String),
}

impl HistoryError {
    /// True when a backing file or directory is missing or cannot be
    /// opened, the cases `init` may be able to repair
    pub fn is_storage_failure(&self) -> bool {
        match self {
            HistoryError::Io(_) => true,
            HistoryError::Csv(e) => matches!(e.kind(), csv::ErrorKind::Io(_)),
            _ => false,
        }
    }
}
