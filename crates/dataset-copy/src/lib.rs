//! # dataset-copy
//!
//! Bounded-memory dataset transfer between data-store instances reachable
//! only through a paginated HTTP API.
//!
//! This library provides:
//!
//! - **Date range filtering** pushed down to the source query
//! - **Two strategies**: one export and one replace call for small datasets,
//!   paginated reads spilled to disk for large ones
//! - **Staged multi-part writes** that become visible only on commit, with a
//!   best-effort abort on failure
//! - **Cached target listing** for create-or-replace by name
//!
//! ## Example
//!
//! ```rust,no_run
//! use dataset_copy::{Config, Orchestrator, TargetRef, TransferRequest};
//!
//! #[tokio::main]
//! async fn main() -> dataset_copy::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut orchestrator = Orchestrator::new(config)?;
//!     let request = TransferRequest::new("8c0f5f0e-source-id", TargetRef::SourceName);
//!     let result = orchestrator.run(&request).await?;
//!     println!("Copied {} rows", result.rows_copied);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod source;
pub mod staging;
pub mod target;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use api::{ApiClient, DatasetApi, SourceApi, TargetApi};
pub use catalog::DatasetCache;
pub use config::{Config, EndpointConfig, TransferSettings};
pub use crate::core::{Column, ColumnType, Dataset, DatasetSummary, Strategy};
pub use error::{CopyError, Result};
pub use orchestrator::{
    format_row_count, NoProgress, Orchestrator, ProgressReporter, TargetRef, TransferPhase,
    TransferRequest, TransferResult,
};
pub use source::{DateFilter, Predicate};
