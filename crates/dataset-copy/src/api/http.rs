//! HTTP implementation of the data-store API.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use super::query::SourceQuery;
use super::wire::{
    CreateDatasetRequest, CreateSchemas, CreateStreamRequest, CreatedDto, DataSetRef,
    DataSourceDto, ExecutionDto, ListingDto, QueryRequest, QueryResult, SearchRequest, StreamInfo,
};
use super::{DatasetApi, SourceApi, TargetApi};
use crate::config::{EndpointConfig, TransferSettings};
use crate::core::{Column, Dataset, DatasetSummary};
use crate::error::{CopyError, Result};

/// Header carrying the developer token.
const TOKEN_HEADER: &str = "X-DOMO-Developer-Token";

/// Page size of the dataset listing.
const LISTING_PAGE_SIZE: usize = 50;

/// Result count requested from the search fallback.
const SEARCH_COUNT: usize = 500;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Update method of staging channels created by this client.
const REPLACE: &str = "REPLACE";

/// Client for one instance.
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
    instance: String,
    bulk_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("bulk_timeout", &self.bulk_timeout)
            .finish()
    }
}

impl ApiClient {
    /// Build a client from endpoint config and transfer settings.
    pub fn new(endpoint: &EndpointConfig, settings: &TransferSettings) -> Result<Self> {
        let token = endpoint.resolve_token()?;
        let http = Client::builder()
            .timeout(settings.get_request_timeout())
            .build()?;
        let base_url = endpoint.base_url();
        let instance = if endpoint.instance.is_empty() {
            base_url.clone()
        } else {
            endpoint.instance.clone()
        };

        Ok(Self {
            http,
            base_url,
            token,
            instance,
            bulk_timeout: settings.get_bulk_timeout(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
    }

    /// Request for calls that move a whole dataset.
    fn bulk_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path).timeout(self.bulk_timeout)
    }

    async fn fetch_listing(&self, offset: Option<usize>) -> Result<ListingDto> {
        let mut req = self.request(Method::GET, "/api/data/v3/datasources");
        if let Some(offset) = offset {
            req = req.query(&[("limit", LISTING_PAGE_SIZE), ("offset", offset)]);
        }
        let response = check("list datasets", req.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Plain listing, following the reported total across pages.
    async fn list_paginated(&self) -> Result<Vec<DatasetSummary>> {
        let first = self.fetch_listing(None).await?;
        Ok(collect_listing(&self.instance, first, |offset| self.fetch_listing(Some(offset))).await)
    }

    async fn search_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let req = self
            .request(Method::POST, "/api/data/ui/v3/datasources/search")
            .json(&SearchRequest::by_name(SEARCH_COUNT));
        let response = check("search datasets", req.send().await?).await?;
        let listing: ListingDto = response.json().await?;
        Ok(listing
            .data_sources
            .into_iter()
            .map(DataSourceDto::into_summary)
            .collect())
    }
}

/// Collect the first listing page and every follow-up page up to the
/// reported total.
///
/// A failing or empty follow-up page ends the listing with what was already
/// read. Without a total only the first page is used.
async fn collect_listing<F, Fut>(instance: &str, first: ListingDto, mut fetch_page: F) -> Vec<DatasetSummary>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<ListingDto>>,
{
    let total = first.meta.as_ref().and_then(|m| m.total_count);
    let mut out: Vec<DatasetSummary> = first
        .data_sources
        .into_iter()
        .map(DataSourceDto::into_summary)
        .collect();

    let Some(total) = total else {
        return out;
    };
    let mut offset = out.len();
    while offset > 0 && offset < total {
        match fetch_page(offset).await {
            Ok(page) if !page.data_sources.is_empty() => {
                offset += page.data_sources.len();
                out.extend(page.data_sources.into_iter().map(DataSourceDto::into_summary));
            }
            Ok(_) => break,
            Err(e) => {
                warn!(
                    "{}: listing page at offset {} failed, keeping {} datasets: {}",
                    instance,
                    offset,
                    out.len(),
                    e
                );
                break;
            }
        }
    }
    out
}

/// Use the search endpoint when the plain listing failed.
///
/// If the search fails too, the listing error is returned.
async fn with_search_fallback<F, Fut>(
    instance: &str,
    listed: Result<Vec<DatasetSummary>>,
    search: F,
) -> Result<Vec<DatasetSummary>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<DatasetSummary>>>,
{
    let listing_err = match listed {
        Ok(list) => return Ok(list),
        Err(e) => e,
    };
    warn!(
        "{}: dataset listing failed, falling back to search: {}",
        instance, listing_err
    );
    search().await.map_err(|search_err| {
        debug!("{}: search fallback failed: {}", instance, search_err);
        listing_err
    })
}

/// Map a non-success response to [`CopyError::Api`].
async fn check(endpoint: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CopyError::api(
        endpoint,
        status.as_u16(),
        body.chars().take(MAX_ERROR_BODY).collect::<String>(),
    ))
}

/// Accept an id only if it is safe to place in a URL path.
fn path_segment(id: &str) -> Result<&str> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && id != "."
        && id != "..";
    if ok {
        Ok(id)
    } else {
        Err(CopyError::metadata(id, "dataset id contains characters not allowed in a URL path"))
    }
}

#[async_trait]
impl DatasetApi for ApiClient {
    fn instance(&self) -> &str {
        &self.instance
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Dataset> {
        let id = path_segment(dataset_id)?;
        let req = self.request(Method::GET, &format!("/api/data/v3/datasources/{}", id));
        let response = check("dataset metadata", req.send().await?).await?;
        let dto: DataSourceDto = response
            .json()
            .await
            .map_err(|e| CopyError::metadata(id, format!("malformed metadata: {}", e)))?;
        Ok(dto.into_dataset())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let listed = self.list_paginated().await;
        with_search_fallback(&self.instance, listed, || self.search_datasets()).await
    }
}

#[async_trait]
impl SourceApi for ApiClient {
    async fn query(&self, dataset_id: &str, query: &SourceQuery) -> Result<QueryResult> {
        let id = path_segment(dataset_id)?;
        let sql = query.to_sql()?;
        debug!("{}: query {}: {}", self.instance, id, sql);
        let req = self
            .bulk_request(Method::POST, &format!("/api/query/v1/execute/{}", id))
            .json(&QueryRequest { sql });
        let response = check("query", req.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn export_csv(&self, dataset_id: &str) -> Result<String> {
        let id = path_segment(dataset_id)?;
        let req = self
            .bulk_request(Method::GET, &format!("/api/data/v3/datasources/{}/data", id))
            .query(&[("includeHeader", "true")])
            .header("Accept", "text/csv");
        let response = check("export", req.send().await?).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TargetApi for ApiClient {
    async fn create_dataset(&self, name: &str, columns: &[Column]) -> Result<String> {
        let req = self
            .request(Method::POST, "/api/data/v3/datasources")
            .json(&CreateDatasetRequest {
                name,
                schemas: CreateSchemas { columns },
            });
        let response = check("create dataset", req.send().await?).await?;
        let created: CreatedDto = response.json().await?;
        Ok(created.id)
    }

    async fn replace_data(&self, dataset_id: &str, csv: String) -> Result<()> {
        let id = path_segment(dataset_id)?;
        let req = self
            .bulk_request(Method::PUT, &format!("/api/data/v3/datasources/{}/data", id))
            .header("Content-Type", "text/csv")
            .body(csv);
        check("replace data", req.send().await?).await?;
        Ok(())
    }

    async fn find_stream(&self, dataset_id: &str) -> Result<Option<StreamInfo>> {
        let id = path_segment(dataset_id)?;
        let req = self
            .request(Method::GET, "/api/data/v1/streams/search")
            .query(&[("q", format!("dataSource.id:{}", id)), ("fields", "all".to_string())]);
        let response = check("find stream", req.send().await?).await?;
        let streams: Vec<StreamInfo> = response.json().await?;
        Ok(streams.into_iter().find(|s| {
            s.is_bound_to(id)
                && s.update_method
                    .as_deref()
                    .map_or(true, |m| m.eq_ignore_ascii_case(REPLACE))
        }))
    }

    async fn create_stream(&self, dataset_id: &str) -> Result<StreamInfo> {
        let id = path_segment(dataset_id)?;
        let req = self
            .request(Method::POST, "/api/data/v1/streams")
            .json(&CreateStreamRequest {
                data_set: DataSetRef { id: id.to_string() },
                update_method: REPLACE.to_string(),
            });
        let response = check("create stream", req.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn create_execution(&self, stream_id: i64) -> Result<i64> {
        let req = self.request(
            Method::POST,
            &format!("/api/data/v1/streams/{}/executions", stream_id),
        );
        let response = check("create execution", req.send().await?).await?;
        let execution: ExecutionDto = response.json().await?;
        Ok(execution.id)
    }

    async fn upload_part(
        &self,
        stream_id: i64,
        execution_id: i64,
        part: u32,
        csv: String,
    ) -> Result<()> {
        let req = self
            .bulk_request(
                Method::PUT,
                &format!(
                    "/api/data/v1/streams/{}/executions/{}/part/{}",
                    stream_id, execution_id, part
                ),
            )
            .header("Content-Type", "text/csv")
            .body(csv);
        check(&format!("upload part {}", part), req.send().await?).await?;
        Ok(())
    }

    async fn commit_execution(&self, stream_id: i64, execution_id: i64) -> Result<()> {
        let req = self.bulk_request(
            Method::PUT,
            &format!(
                "/api/data/v1/streams/{}/executions/{}/commit",
                stream_id, execution_id
            ),
        );
        check("commit execution", req.send().await?).await?;
        Ok(())
    }

    async fn abort_execution(&self, stream_id: i64, execution_id: i64) -> Result<()> {
        let req = self.request(
            Method::PUT,
            &format!(
                "/api/data/v1/streams/{}/executions/{}/abort",
                stream_id, execution_id
            ),
        );
        check("abort execution", req.send().await?).await?;
        Ok(())
    }
}
