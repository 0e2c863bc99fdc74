//! Source side of a transfer: metadata, filtering and chunked reads.

mod predicate;
mod reader;

pub use predicate::{build_predicate, DateFilter, Predicate};
pub use reader::ChunkedReader;

use tracing::{debug, info};

use crate::api::{SourceApi, SourceQuery, COUNT_COLUMN};
use crate::core::Dataset;
use crate::error::{CopyError, Result};

/// Fetch the dataset snapshot a transfer works from.
///
/// Errors propagate unchanged. The row count is whatever the metadata
/// endpoint reports and may be stale.
pub async fn resolve_dataset(api: &dyn SourceApi, dataset_id: &str) -> Result<Dataset> {
    let dataset = api.get_dataset(dataset_id).await?;
    if dataset.columns.is_empty() {
        return Err(CopyError::metadata(dataset_id, "dataset has no columns"));
    }
    info!(
        "{}: resolved {} ({}), {} columns, ~{} rows",
        api.instance(),
        dataset.name,
        dataset.id,
        dataset.columns.len(),
        dataset.row_count
    );
    Ok(dataset)
}

/// Exact number of rows matching `predicate` (all rows when `None`).
pub async fn count_rows(
    api: &dyn SourceApi,
    dataset: &Dataset,
    predicate: Option<&Predicate>,
) -> Result<u64> {
    let result = api
        .query(&dataset.id, &SourceQuery::count(predicate.cloned()))
        .await?;

    let idx = result
        .columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(COUNT_COLUMN))
        .unwrap_or(0);
    let cell = result
        .rows
        .first()
        .and_then(|row| row.get(idx))
        .ok_or_else(|| CopyError::metadata(&dataset.id, "count query returned no rows"))?;

    let count = match cell {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        CopyError::metadata(&dataset.id, format!("count query returned {}", cell))
    })?;

    debug!("{}: exact row count {}", dataset.name, count);
    Ok(count)
}
