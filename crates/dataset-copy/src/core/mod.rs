//! Core types shared by every stage of a transfer.
//!
//! - [`schema`]: dataset and column metadata
//! - [`value`]: row values, chunks and schema-aligned row layout
//! - [`identifier`]: identifier quoting and literal rendering for queries
//! - [`strategy`]: small vs large transfer selection

pub mod identifier;
pub mod schema;
pub mod strategy;
pub mod value;

pub use schema::{Column, ColumnType, Dataset, DatasetSummary};
pub use strategy::Strategy;
pub use value::{Chunk, Row, RowLayout, Value};
