//! Transaction input: record types, readers and row-level analyses

pub mod delimited;
pub mod incongruence;
pub mod parquet;
pub mod record;

use std::path::Path;

pub use record::{RawTransaction, Tags, TransactionRecord};

use crate::error::{AnalysisError, Result};

/// Read transaction rows, choosing the reader from the file extension
pub fn read_transactions(path: impl AsRef<Path>) -> Result<Vec<RawTransaction>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("parquet") | Some("pq") => parquet::read_transactions(path),
        Some("csv") | Some("txt") => delimited::read_transactions(path),
        _ => Err(AnalysisError::UnsupportedInput(format!(
            "cannot infer format of {}; expected .csv or .parquet",
            path.display()
        ))),
    }
}
