//! Data-store API seam.
//!
//! The engine only talks to the store through these traits. [`ApiClient`]
//! implements them over HTTP; tests use an in-memory store.

mod http;
pub mod query;
pub mod wire;

pub use http::ApiClient;
pub use query::{Projection, SourceQuery, COUNT_COLUMN};
pub use wire::{QueryResult, StreamInfo};

use async_trait::async_trait;

use crate::core::{Column, Dataset, DatasetSummary};
use crate::error::Result;

/// Operations every endpoint supports.
#[async_trait]
pub trait DatasetApi: Send + Sync {
    /// Instance label for log lines.
    fn instance(&self) -> &str;

    /// Fetch name, row count and schema of one dataset.
    async fn get_dataset(&self, dataset_id: &str) -> Result<Dataset>;

    /// List every dataset visible to the caller.
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>>;
}

/// Read side of a transfer.
#[async_trait]
pub trait SourceApi: DatasetApi {
    /// Run a structured query against one dataset.
    async fn query(&self, dataset_id: &str, query: &SourceQuery) -> Result<QueryResult>;

    /// Export the whole dataset as delimited text with a header row.
    async fn export_csv(&self, dataset_id: &str) -> Result<String>;
}

/// Write side of a transfer.
#[async_trait]
pub trait TargetApi: DatasetApi {
    /// Create an empty dataset and return its id.
    async fn create_dataset(&self, name: &str, columns: &[Column]) -> Result<String>;

    /// Replace the dataset's contents with one delimited-text body.
    async fn replace_data(&self, dataset_id: &str, csv: String) -> Result<()>;

    /// Find the replace-mode staging channel bound to a dataset.
    async fn find_stream(&self, dataset_id: &str) -> Result<Option<StreamInfo>>;

    /// Create a replace-mode staging channel bound to a dataset.
    async fn create_stream(&self, dataset_id: &str) -> Result<StreamInfo>;

    /// Open a staged write and return its execution id.
    async fn create_execution(&self, stream_id: i64) -> Result<i64>;

    /// Upload one numbered part (1-based) to an open execution.
    async fn upload_part(
        &self,
        stream_id: i64,
        execution_id: i64,
        part: u32,
        csv: String,
    ) -> Result<()>;

    /// Publish all uploaded parts atomically.
    async fn commit_execution(&self, stream_id: i64, execution_id: i64) -> Result<()>;

    /// Discard an open execution.
    async fn abort_execution(&self, stream_id: i64, execution_id: i64) -> Result<()>;
}
