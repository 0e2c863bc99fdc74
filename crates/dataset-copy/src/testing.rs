//! In-memory data store for tests.
//!
//! Implements both API sides, evaluates structured queries directly, keeps
//! uploaded parts invisible until their execution commits, and can be told
//! to fail specific calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::api::wire::DataSetRef;
use crate::api::{
    DatasetApi, Projection, QueryResult, SourceApi, SourceQuery, StreamInfo, TargetApi,
    COUNT_COLUMN,
};
use crate::core::{Column, ColumnType, Dataset, DatasetSummary};
use crate::error::{CopyError, Result};
use crate::source::Predicate;

/// A call that should fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    GetDataset,
    List,
    Export,
    /// The n-th row query (1-based); count queries are not included.
    QueryPage(usize),
    Replace,
    UploadPart(u32),
    Commit,
    Abort,
}

/// Number of calls per operation.
#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    pub list: usize,
    pub export: usize,
    pub query_pages: usize,
    pub count: usize,
    pub replace: usize,
    pub create_dataset: usize,
    pub create_stream: usize,
    pub create_execution: usize,
    pub commit: usize,
    pub abort: usize,
}

/// A part that reached the store.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub execution_id: i64,
    pub part: u32,
    pub body: String,
}

struct StoredDataset {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    reported_rows: Option<u64>,
    extra_response_columns: Vec<String>,
}

struct Execution {
    stream_id: i64,
    parts: BTreeMap<u32, String>,
    open: bool,
}

#[derive(Default)]
struct State {
    datasets: BTreeMap<String, StoredDataset>,
    streams: Vec<StreamInfo>,
    executions: HashMap<i64, Execution>,
    uploaded: Vec<UploadedPart>,
    failures: HashSet<FailPoint>,
    calls: CallCounts,
    next_id: i64,
}

#[derive(Clone)]
pub struct MemoryStore {
    instance: String,
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_dataset(&self, id: &str, name: &str, columns: Vec<Column>, rows: Vec<Vec<String>>) {
        self.state().datasets.insert(
            id.to_string(),
            StoredDataset {
                name: name.to_string(),
                columns,
                rows,
                reported_rows: None,
                extra_response_columns: Vec::new(),
            },
        );
    }

    /// Make metadata report `n` rows whatever the real count.
    pub fn set_reported_row_count(&self, id: &str, n: u64) {
        self.state().datasets.get_mut(id).unwrap().reported_rows = Some(n);
    }

    /// Make row queries return an extra column the schema does not declare.
    pub fn add_response_column(&self, id: &str, name: &str) {
        self.state()
            .datasets
            .get_mut(id)
            .unwrap()
            .extra_response_columns
            .push(name.to_string());
    }

    pub fn fail(&self, point: FailPoint) {
        self.state().failures.insert(point);
    }

    pub fn dataset(&self, id: &str) -> Dataset {
        let state = self.state();
        to_dataset(id, &state.datasets[id])
    }

    pub fn dataset_count(&self) -> usize {
        self.state().datasets.len()
    }

    /// Committed rows of a dataset.
    pub fn rows(&self, id: &str) -> Vec<Vec<String>> {
        self.state().datasets[id].rows.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls.clone()
    }

    pub fn uploaded_parts(&self) -> Vec<UploadedPart> {
        self.state().uploaded.clone()
    }

    pub fn open_executions(&self) -> usize {
        self.state().executions.values().filter(|e| e.open).count()
    }
}

fn to_dataset(id: &str, stored: &StoredDataset) -> Dataset {
    Dataset {
        id: id.to_string(),
        name: stored.name.clone(),
        row_count: stored.reported_rows.unwrap_or(stored.rows.len() as u64),
        columns: stored.columns.clone(),
    }
}

fn injected(state: &State, point: FailPoint, endpoint: &str) -> Result<()> {
    if state.failures.contains(&point) {
        let status = if point == FailPoint::GetDataset { 401 } else { 500 };
        return Err(CopyError::api(endpoint, status, "injected failure"));
    }
    Ok(())
}

fn not_found(endpoint: &str, what: impl std::fmt::Display) -> CopyError {
    CopyError::api(endpoint, 404, format!("{} not found", what))
}

fn matches(stored: &StoredDataset, predicate: &Predicate) -> impl Fn(&Vec<String>) -> bool {
    let idx = stored
        .columns
        .iter()
        .position(|c| c.name == predicate.column())
        .unwrap();
    // Time-bearing columns use an exclusive bound at the start of the next day.
    let (lower, upper, inclusive) = if predicate.column_type().has_time() {
        let next_day = predicate.end().succ_opt().unwrap();
        (
            format!("{} 00:00:00", predicate.start()),
            format!("{} 00:00:00", next_day),
            false,
        )
    } else {
        (predicate.start().to_string(), predicate.end().to_string(), true)
    };
    move |row: &Vec<String>| {
        let v = row[idx].as_str();
        let below = if inclusive {
            v <= upper.as_str()
        } else {
            v < upper.as_str()
        };
        !v.is_empty() && v >= lower.as_str() && below
    }
}

/// Numeric columns come back as JSON numbers, like the live query endpoint.
fn json_cell(text: &str, is_number: bool) -> serde_json::Value {
    if text.is_empty() {
        return serde_json::Value::Null;
    }
    if is_number {
        if let Ok(n) = serde_json::from_str::<serde_json::Number>(text) {
            return serde_json::Value::Number(n);
        }
    }
    serde_json::Value::String(text.to_string())
}

fn parse_csv(body: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

#[async_trait]
impl DatasetApi for MemoryStore {
    fn instance(&self) -> &str {
        &self.instance
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Dataset> {
        let state = self.state();
        injected(&state, FailPoint::GetDataset, "dataset metadata")?;
        state
            .datasets
            .get(dataset_id)
            .map(|d| to_dataset(dataset_id, d))
            .ok_or_else(|| not_found("dataset metadata", dataset_id))
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let mut state = self.state();
        state.calls.list += 1;
        injected(&state, FailPoint::List, "list datasets")?;
        Ok(state
            .datasets
            .iter()
            .map(|(id, d)| DatasetSummary {
                id: id.clone(),
                name: d.name.clone(),
                row_count: Some(d.rows.len() as u64),
            })
            .collect())
    }
}

#[async_trait]
impl SourceApi for MemoryStore {
    async fn query(&self, dataset_id: &str, query: &SourceQuery) -> Result<QueryResult> {
        // Rendering must succeed for every query the engine issues.
        query.to_sql()?;

        let mut state = self.state();
        let stored = state
            .datasets
            .get(dataset_id)
            .ok_or_else(|| not_found("query", dataset_id))?;

        let filtered: Vec<&Vec<String>> = match &query.filter {
            Some(p) => {
                let keep = matches(stored, p);
                stored.rows.iter().filter(|r| keep(r)).collect()
            }
            None => stored.rows.iter().collect(),
        };

        if query.projection == Projection::Count {
            let n = filtered.len();
            state.calls.count += 1;
            return Ok(QueryResult {
                columns: vec![COUNT_COLUMN.to_string()],
                rows: vec![vec![serde_json::json!(n)]],
            });
        }

        let mut columns: Vec<String> = stored.columns.iter().map(|c| c.name.clone()).collect();
        columns.extend(stored.extra_response_columns.iter().cloned());
        let extra = stored.extra_response_columns.len();
        let numeric: Vec<bool> = stored
            .columns
            .iter()
            .map(|c| {
                matches!(
                    c.column_type,
                    ColumnType::Long | ColumnType::Double | ColumnType::Decimal
                )
            })
            .collect();
        let rows: Vec<Vec<serde_json::Value>> = filtered
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|r| {
                r.iter()
                    .zip(numeric.iter())
                    .map(|(v, &is_number)| json_cell(v, is_number))
                    .chain(std::iter::repeat(serde_json::Value::Null).take(extra))
                    .collect()
            })
            .collect();

        state.calls.query_pages += 1;
        let page = state.calls.query_pages;
        injected(&state, FailPoint::QueryPage(page), "query")?;
        Ok(QueryResult { columns, rows })
    }

    async fn export_csv(&self, dataset_id: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.export += 1;
        injected(&state, FailPoint::Export, "export")?;
        let stored = state
            .datasets
            .get(dataset_id)
            .ok_or_else(|| not_found("export", dataset_id))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(stored.columns.iter().map(|c| c.name.as_str()))?;
        for row in &stored.rows {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| CopyError::Io(e.into_error()))?;
        Ok(String::from_utf8(bytes).unwrap())
    }
}

#[async_trait]
impl TargetApi for MemoryStore {
    async fn create_dataset(&self, name: &str, columns: &[Column]) -> Result<String> {
        let mut state = self.state();
        state.calls.create_dataset += 1;
        state.next_id += 1;
        let id = format!("ds-{}", state.next_id);
        state.datasets.insert(
            id.clone(),
            StoredDataset {
                name: name.to_string(),
                columns: columns.to_vec(),
                rows: Vec::new(),
                reported_rows: None,
                extra_response_columns: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn replace_data(&self, dataset_id: &str, csv: String) -> Result<()> {
        let mut state = self.state();
        state.calls.replace += 1;
        injected(&state, FailPoint::Replace, "replace data")?;
        let rows = parse_csv(&csv)?;
        let stored = state
            .datasets
            .get_mut(dataset_id)
            .ok_or_else(|| not_found("replace data", dataset_id))?;
        stored.rows = rows;
        Ok(())
    }

    async fn find_stream(&self, dataset_id: &str) -> Result<Option<StreamInfo>> {
        Ok(self
            .state()
            .streams
            .iter()
            .find(|s| s.is_bound_to(dataset_id))
            .cloned())
    }

    async fn create_stream(&self, dataset_id: &str) -> Result<StreamInfo> {
        let mut state = self.state();
        state.calls.create_stream += 1;
        if !state.datasets.contains_key(dataset_id) {
            return Err(not_found("create stream", dataset_id));
        }
        state.next_id += 1;
        let stream = StreamInfo {
            id: state.next_id,
            data_set: Some(DataSetRef {
                id: dataset_id.to_string(),
            }),
            update_method: Some("REPLACE".to_string()),
        };
        state.streams.push(stream.clone());
        Ok(stream)
    }

    async fn create_execution(&self, stream_id: i64) -> Result<i64> {
        let mut state = self.state();
        state.calls.create_execution += 1;
        if !state.streams.iter().any(|s| s.id == stream_id) {
            return Err(not_found("create execution", format!("stream {}", stream_id)));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.executions.insert(
            id,
            Execution {
                stream_id,
                parts: BTreeMap::new(),
                open: true,
            },
        );
        Ok(id)
    }

    async fn upload_part(
        &self,
        stream_id: i64,
        execution_id: i64,
        part: u32,
        csv: String,
    ) -> Result<()> {
        let endpoint = format!("upload part {}", part);
        let mut state = self.state();
        injected(&state, FailPoint::UploadPart(part), &endpoint)?;
        let execution = state
            .executions
            .get_mut(&execution_id)
            .filter(|e| e.open && e.stream_id == stream_id)
            .ok_or_else(|| not_found(&endpoint, format!("open execution {}", execution_id)))?;
        execution.parts.insert(part, csv.clone());
        state.uploaded.push(UploadedPart {
            execution_id,
            part,
            body: csv,
        });
        Ok(())
    }

    async fn commit_execution(&self, stream_id: i64, execution_id: i64) -> Result<()> {
        let mut state = self.state();
        state.calls.commit += 1;
        injected(&state, FailPoint::Commit, "commit execution")?;

        let execution = state
            .executions
            .get_mut(&execution_id)
            .filter(|e| e.open && e.stream_id == stream_id)
            .ok_or_else(|| not_found("commit execution", execution_id))?;
        let contiguous = execution.parts.keys().copied().eq(1..=execution.parts.len() as u32);
        if !contiguous {
            return Err(CopyError::api("commit execution", 400, "parts are not contiguous"));
        }
        execution.open = false;
        let body: String = execution.parts.values().map(String::as_str).collect();

        let dataset_id = state
            .streams
            .iter()
            .find(|s| s.id == stream_id)
            .and_then(|s| s.data_set.as_ref())
            .map(|d| d.id.clone())
            .ok_or_else(|| not_found("commit execution", format!("stream {}", stream_id)))?;
        let rows = parse_csv(&body)?;
        let stored = state
            .datasets
            .get_mut(&dataset_id)
            .ok_or_else(|| not_found("commit execution", &dataset_id))?;
        stored.rows = rows;
        Ok(())
    }

    async fn abort_execution(&self, stream_id: i64, execution_id: i64) -> Result<()> {
        let mut state = self.state();
        state.calls.abort += 1;
        injected(&state, FailPoint::Abort, "abort execution")?;
        let execution = state
            .executions
            .get_mut(&execution_id)
            .filter(|e| e.open && e.stream_id == stream_id)
            .ok_or_else(|| not_found("abort execution", execution_id))?;
        execution.open = false;
        execution.parts.clear();
        Ok(())
    }
}
