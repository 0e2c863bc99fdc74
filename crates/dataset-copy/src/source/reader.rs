//! Chunked reads from the source.

use tracing::debug;

use super::Predicate;
use crate::api::{QueryResult, SourceApi, SourceQuery};
use crate::core::{Chunk, Dataset, Row, RowLayout, Strategy, Value};
use crate::error::{CopyError, Result};

/// Lazy, finite sequence of chunks from one dataset.
///
/// The small strategy yields a single chunk: the full export when no
/// predicate is set, otherwise one unbounded filtered query. The large
/// strategy pages with `LIMIT`/`OFFSET` and stops on a short page, an empty
/// page, or once the offset reaches the known total. The reader cannot be
/// restarted; a failed page ends the sequence with that error.
pub struct ChunkedReader<'a> {
    api: &'a dyn SourceApi,
    dataset: &'a Dataset,
    predicate: Option<Predicate>,
    strategy: Strategy,
    page_size: usize,
    total: Option<u64>,
    columns: Vec<String>,
    offset: u64,
    pages_read: usize,
    done: bool,
}

impl<'a> ChunkedReader<'a> {
    /// `total` is the exact post-filter row count when known. Without it the
    /// large strategy relies on short pages alone.
    pub fn new(
        api: &'a dyn SourceApi,
        dataset: &'a Dataset,
        predicate: Option<Predicate>,
        strategy: Strategy,
        page_size: usize,
        total: Option<u64>,
    ) -> Self {
        Self {
            api,
            dataset,
            predicate,
            strategy,
            page_size: page_size.max(1),
            total,
            columns: dataset.column_names(),
            offset: 0,
            pages_read: 0,
            done: false,
        }
    }

    /// Rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.offset
    }

    /// Source requests made so far.
    pub fn pages_read(&self) -> usize {
        self.pages_read
    }

    /// Column names every chunk is aligned to.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Next chunk, or `None` once the source is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }

        let result = match self.strategy {
            Strategy::Small => self.read_all().await,
            Strategy::Large => self.read_page().await,
        };
        if result.is_err() {
            self.done = true;
        }
        result
    }

    async fn read_all(&mut self) -> Result<Option<Chunk>> {
        self.done = true;
        let rows = match &self.predicate {
            None => {
                let csv = self.api.export_csv(&self.dataset.id).await?;
                self.rows_from_csv(&csv)?
            }
            Some(predicate) => {
                let query = SourceQuery::all(Some(predicate.clone()));
                let result = self.api.query(&self.dataset.id, &query).await?;
                self.rows_from_query(result)?
            }
        };
        self.pages_read += 1;
        self.offset = rows.len() as u64;
        debug!("{}: single read returned {} rows", self.dataset.name, rows.len());
        Ok(Some(Chunk::new(self.columns.clone(), rows)))
    }

    async fn read_page(&mut self) -> Result<Option<Chunk>> {
        if self.total.is_some_and(|total| self.offset >= total) {
            self.done = true;
            return Ok(None);
        }

        let query = SourceQuery::page(self.predicate.clone(), self.page_size, self.offset);
        let result = self.api.query(&self.dataset.id, &query).await?;
        self.pages_read += 1;
        let rows = self.rows_from_query(result)?;

        debug!(
            "{}: page {} at offset {} returned {} rows",
            self.dataset.name,
            self.pages_read,
            self.offset,
            rows.len()
        );

        if rows.len() < self.page_size {
            self.done = true;
        }
        if rows.is_empty() {
            return Ok(None);
        }
        self.offset += rows.len() as u64;
        Ok(Some(Chunk::new(self.columns.clone(), rows)))
    }

    fn rows_from_query(&self, result: QueryResult) -> Result<Vec<Row>> {
        let layout = RowLayout::new(&self.columns, &result.columns)?;
        result
            .rows
            .into_iter()
            .map(|cells| layout.project(cells.into_iter().map(Value::from_json).collect()))
            .collect()
    }

    fn rows_from_csv(&self, csv: &str) -> Result<Vec<Row>> {
        if csv.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv.as_bytes());
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let layout = RowLayout::new(&self.columns, &header).map_err(|e| {
            CopyError::transfer(&self.dataset.name, format!("export header: {}", e))
        })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(layout.project(record.iter().map(Value::from_field).collect())?);
        }
        Ok(rows)
    }
}
