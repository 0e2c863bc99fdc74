//! Request and response bodies exchanged with the data-store API.

use serde::{Deserialize, Serialize};

use crate::core::{Column, Dataset, DatasetSummary};

/// Dataset as returned by the metadata, listing and create endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub schemas: Option<SchemasDto>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemasDto {
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl DataSourceDto {
    pub fn into_dataset(self) -> Dataset {
        Dataset {
            id: self.id,
            name: self.name,
            row_count: self.row_count.unwrap_or(0),
            columns: self.schemas.map(|s| s.columns).unwrap_or_default(),
        }
    }

    pub fn into_summary(self) -> DatasetSummary {
        DatasetSummary {
            id: self.id,
            name: self.name,
            row_count: self.row_count,
        }
    }
}

/// One page of the dataset listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingDto {
    #[serde(rename = "dataSources", default)]
    pub data_sources: Vec<DataSourceDto>,
    #[serde(rename = "_metaData", default)]
    pub meta: Option<ListingMetaDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingMetaDto {
    pub total_count: Option<usize>,
}

/// Body of the search endpoint used when the plain listing fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filters: Vec<serde_json::Value>,
    pub combine_results: bool,
    pub count: usize,
    pub offset: usize,
    pub sort: SearchSort,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSort {
    pub field: String,
    pub order: String,
}

impl SearchRequest {
    pub fn by_name(count: usize) -> Self {
        Self {
            filters: Vec::new(),
            combine_results: true,
            count,
            offset: 0,
            sort: SearchSort {
                field: "name".to_string(),
                order: "ASC".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDatasetRequest<'a> {
    pub name: &'a str,
    pub schemas: CreateSchemas<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSchemas<'a> {
    pub columns: &'a [Column],
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub sql: String,
}

/// Column names plus row tuples.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// A staging channel bound to one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: i64,
    #[serde(default)]
    pub data_set: Option<DataSetRef>,
    #[serde(default)]
    pub update_method: Option<String>,
}

impl StreamInfo {
    /// Whether this channel feeds the given dataset.
    pub fn is_bound_to(&self, dataset_id: &str) -> bool {
        self.data_set.as_ref().map(|d| d.id.as_str()) == Some(dataset_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamRequest {
    pub data_set: DataSetRef,
    pub update_method: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionDto {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDto {
    pub id: String,
}
