//! Transfer orchestrator - main workflow coordinator.
//!
//! One run moves one dataset: resolve metadata, optionally build a date
//! filter, pick the small or large strategy from the post-filter row count,
//! read and stage every chunk, then write to the target. Each step finishes
//! before the next starts and the run only ever moves forward through
//! [`TransferPhase`].

mod progress;

pub use progress::{format_row_count, NoProgress, ProgressReporter};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, SourceApi, TargetApi};
use crate::catalog::DatasetCache;
use crate::config::{Config, TransferSettings};
use crate::core::{Dataset, DatasetSummary, Strategy};
use crate::error::{CopyError, Result};
use crate::source::{build_predicate, count_rows, resolve_dataset, ChunkedReader, DateFilter};
use crate::staging::StagingArea;
use crate::target::TargetWriter;
use progress::ProgressTracker;

/// Where the copy lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRef {
    /// An existing dataset.
    Id(String),
    /// Looked up by name, ignoring case; created when absent.
    Name(String),
    /// Same as `Name` with the source dataset's name.
    SourceName,
}

/// What to copy and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_id: String,
    pub target: TargetRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DateFilter>,
}

impl TransferRequest {
    pub fn new(source_id: impl Into<String>, target: TargetRef) -> Self {
        Self {
            source_id: source_id.into(),
            target,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: DateFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransferPhase {
    Idle,
    ResolvingMetadata,
    BuildingPredicate,
    Reading,
    Writing,
    Committed,
    Aborted,
}

impl TransferPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferPhase::Committed | TransferPhase::Aborted)
    }
}

/// Result of a transfer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    /// Unique run identifier.
    pub run_id: String,

    pub source_dataset_id: String,

    pub source_name: String,

    pub target_dataset_id: String,

    pub target_name: String,

    /// Whether this run created the target dataset.
    pub created_target: bool,

    /// Total rows written to the target.
    pub rows_copied: u64,

    pub strategy: Strategy,

    /// Applied filter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// When the transfer started.
    pub started_at: DateTime<Utc>,

    /// When the transfer completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl TransferResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct ResolvedTarget {
    id: String,
    name: String,
    created: bool,
}

/// Target as located before the read. Creation waits until there is data to write.
enum TargetPlan {
    Existing(ResolvedTarget),
    Create(String),
}

/// Transfer orchestrator.
pub struct Orchestrator {
    settings: TransferSettings,
    source: Arc<dyn SourceApi>,
    target: Arc<dyn TargetApi>,
    target_cache: DatasetCache,
    reporter: Arc<dyn ProgressReporter>,
    phase: TransferPhase,
}

impl Orchestrator {
    /// Create an orchestrator talking HTTP to the configured instances.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = ApiClient::new(&config.source, &config.transfer)?;
        let target = ApiClient::new(&config.target, &config.transfer)?;
        Ok(Self::with_apis(
            Arc::new(source),
            Arc::new(target),
            config.transfer,
        ))
    }

    /// Create an orchestrator over arbitrary API implementations.
    pub fn with_apis(
        source: Arc<dyn SourceApi>,
        target: Arc<dyn TargetApi>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            target_cache: DatasetCache::new(settings.get_listing_ttl()),
            settings,
            source,
            target,
            reporter: Arc::new(NoProgress),
            phase: TransferPhase::Idle,
        }
    }

    /// Route progress and status updates to `reporter`.
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Phase of the current or last run.
    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    pub fn source(&self) -> &dyn SourceApi {
        self.source.as_ref()
    }

    pub fn target(&self) -> &dyn TargetApi {
        self.target.as_ref()
    }

    /// Target listing, served from the cache while fresh.
    pub async fn target_datasets(&mut self) -> Result<Vec<DatasetSummary>> {
        Ok(self.target_cache.list(self.target.as_ref()).await?.to_vec())
    }

    /// Case-insensitive name lookup on the target.
    pub async fn find_target(&mut self, name: &str) -> Result<Option<DatasetSummary>> {
        self.target_cache
            .find_by_name(self.target.as_ref(), name)
            .await
    }

    fn enter(&mut self, next: TransferPhase) {
        if next <= self.phase || self.phase.is_terminal() {
            debug!("ignoring phase change {:?} -> {:?}", self.phase, next);
            return;
        }
        debug!("phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Run one transfer.
    pub async fn run(&mut self, request: &TransferRequest) -> Result<TransferResult> {
        self.phase = TransferPhase::Idle;
        let mut progress = ProgressTracker::new(Arc::clone(&self.reporter));

        match self.execute(request, &mut progress).await {
            Ok(result) => {
                self.enter(TransferPhase::Committed);
                self.target_cache.invalidate();
                progress.progress(1.0);
                progress.status(&format!(
                    "Copied {} rows to {}",
                    format_row_count(result.rows_copied),
                    result.target_name
                ));
                info!(
                    "Transfer {} complete: {} rows to {} in {:.1}s",
                    result.run_id, result.rows_copied, result.target_dataset_id, result.duration_seconds
                );
                Ok(result)
            }
            Err(e) => {
                self.enter(TransferPhase::Aborted);
                error!("Transfer of {} failed: {}", request.source_id, e);
                progress.status(&format!("Transfer failed: {}", e));
                Err(e)
            }
        }
    }

    async fn execute(
        &mut self,
        request: &TransferRequest,
        progress: &mut ProgressTracker,
    ) -> Result<TransferResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let source = Arc::clone(&self.source);
        let target = Arc::clone(&self.target);
        info!("Starting transfer run: {}", run_id);

        // Phase 1: metadata
        self.enter(TransferPhase::ResolvingMetadata);
        progress.status("Resolving source metadata");
        let dataset = resolve_dataset(source.as_ref(), &request.source_id).await?;
        progress.progress(0.05);

        // Phase 2: optional filter
        let predicate = match &request.filter {
            Some(filter) => {
                self.enter(TransferPhase::BuildingPredicate);
                progress.status(&format!("Building filter on {}", filter.column));
                build_predicate(&dataset, filter)
            }
            None => None,
        };

        let (row_count, exact) = match &predicate {
            Some(p) => (count_rows(source.as_ref(), &dataset, Some(p)).await?, true),
            None => (dataset.row_count, false),
        };
        let strategy = Strategy::select(row_count, self.settings.get_small_transfer_threshold());
        let total = match (exact, strategy) {
            (true, _) => Some(row_count),
            (false, Strategy::Large) => Some(count_rows(source.as_ref(), &dataset, None).await?),
            (false, Strategy::Small) => None,
        };
        progress.progress(0.1);

        info!(
            "{}: {} rows{}, using {} strategy",
            dataset.name,
            row_count,
            if exact { " after filter" } else { "" },
            strategy
        );
        progress.status(&format!(
            "Copying {} rows from {} ({} transfer)",
            format_row_count(total.unwrap_or(row_count)),
            dataset.name,
            strategy
        ));

        progress.status("Locating target dataset");
        let plan = self.locate_target(&request.target, &dataset).await?;

        // Phase 3: read and stage
        self.enter(TransferPhase::Reading);
        let mut staging = StagingArea::for_strategy(
            strategy,
            dataset.column_names(),
            self.settings.spill_dir.as_deref(),
        )?;
        let mut reader = ChunkedReader::new(
            source.as_ref(),
            &dataset,
            predicate.clone(),
            strategy,
            self.settings.get_page_size(),
            total,
        );
        let expected = total.unwrap_or(row_count);
        while let Some(chunk) = reader.next_chunk().await? {
            staging.append(chunk)?;
            let staged = staging.rows();
            progress.progress_between(0.1, 0.6, staged, expected.max(staged));
            progress.status(&format!(
                "Read {} of {} rows",
                format_row_count(staged),
                format_row_count(expected.max(staged))
            ));
        }
        debug!("{}: {} source requests", dataset.name, reader.pages_read());
        let staged = staging.finish()?;

        if let Some(total) = total {
            if staged.rows() != total {
                warn!(
                    "{}: expected {} rows but read {}, source changed during the read",
                    dataset.name,
                    total,
                    staged.rows()
                );
            }
        }

        // Phase 4: write
        self.enter(TransferPhase::Writing);
        progress.status("Preparing target dataset");
        let resolved = self.prepare_target(plan, &dataset).await?;
        let writer = TargetWriter::new(target.as_ref(), self.settings.get_part_size());
        let rows_copied = match strategy {
            Strategy::Small => {
                progress.status(&format!("Writing {} rows", format_row_count(staged.rows())));
                writer.replace(&resolved.id, staged).await?
            }
            Strategy::Large => {
                let mut on_part = |done: u32, parts: u32| {
                    progress.progress_between(0.6, 0.95, done as u64, parts as u64);
                    progress.status(&format!("Uploaded part {} of {}", done, parts));
                };
                writer.write_staged(&resolved.id, staged, &mut on_part).await?
            }
        };
        progress.progress(0.95);

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        Ok(TransferResult {
            run_id,
            source_dataset_id: dataset.id.clone(),
            source_name: dataset.name.clone(),
            target_dataset_id: resolved.id,
            target_name: resolved.name,
            created_target: resolved.created,
            rows_copied,
            strategy,
            filter: predicate.map(|p| p.describe()),
            started_at,
            completed_at,
            duration_seconds,
        })
    }

    /// Find the target without creating anything.
    async fn locate_target(&mut self, target: &TargetRef, source: &Dataset) -> Result<TargetPlan> {
        let name = match target {
            TargetRef::Id(id) => {
                let existing = self.target.get_dataset(id).await?;
                if existing.column_names() != source.column_names() {
                    warn!(
                        "{}: target columns {:?} differ from source columns {:?}",
                        existing.name,
                        existing.column_names(),
                        source.column_names()
                    );
                }
                return Ok(TargetPlan::Existing(ResolvedTarget {
                    id: existing.id,
                    name: existing.name,
                    created: false,
                }));
            }
            TargetRef::Name(name) => name.as_str(),
            TargetRef::SourceName => source.name.as_str(),
        };

        if name.trim().is_empty() {
            return Err(CopyError::Config("target dataset name is empty".to_string()));
        }

        match self.find_target(name).await? {
            Some(existing) => {
                info!("{}: replacing existing dataset {}", name, existing.id);
                Ok(TargetPlan::Existing(ResolvedTarget {
                    id: existing.id,
                    name: existing.name,
                    created: false,
                }))
            }
            None => {
                debug!("{}: no existing dataset, will create one", name);
                Ok(TargetPlan::Create(name.to_string()))
            }
        }
    }

    async fn prepare_target(&mut self, plan: TargetPlan, source: &Dataset) -> Result<ResolvedTarget> {
        let name = match plan {
            TargetPlan::Existing(resolved) => return Ok(resolved),
            TargetPlan::Create(name) => name,
        };

        let id = self.target.create_dataset(&name, &source.columns).await?;
        self.target_cache.invalidate();
        info!("{}: created dataset {}", name, id);
        Ok(ResolvedTarget {
            id,
            name,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ColumnType};
    use crate::testing::{FailPoint, MemoryStore};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", ColumnType::Long),
            Column::new("day", ColumnType::Date),
            Column::new("amount", ColumnType::Double),
        ]
    }

    fn rows(n: usize) -> Vec<Vec<String>> {
        (0..n)
            .map(|i| {
                vec![
                    i.to_string(),
                    format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1),
                    format!("{}.5", i),
                ]
            })
            .collect()
    }

    fn stores(n: usize) -> (MemoryStore, MemoryStore) {
        let source = MemoryStore::new("source");
        source.add_dataset("src", "Sales", columns(), rows(n));
        let target = MemoryStore::new("target");
        (source, target)
    }

    fn settings(threshold: u64, page: usize) -> TransferSettings {
        TransferSettings {
            small_transfer_threshold: Some(threshold),
            page_size: Some(page),
            ..Default::default()
        }
    }

    fn orchestrator(source: &MemoryStore, target: &MemoryStore, settings: TransferSettings) -> Orchestrator {
        Orchestrator::with_apis(Arc::new(source.clone()), Arc::new(target.clone()), settings)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_large_scenario_counts_requests() {
        let (source, target) = stores(1200);
        let mut orch = orchestrator(&source, &target, settings(500, 500));
        let result = orch
            .run(&TransferRequest::new("src", TargetRef::Name("Sales Copy".into())))
            .await
            .unwrap();

        assert_eq!(result.strategy, Strategy::Large);
        assert_eq!(result.rows_copied, 1200);
        assert!(result.created_target);
        assert_eq!(source.calls().query_pages, 3);
        assert_eq!(target.uploaded_parts().len(), 3);
        assert_eq!(target.calls().commit, 1);
        assert_eq!(target.rows(&result.target_dataset_id), rows(1200));
        assert_eq!(orch.phase(), TransferPhase::Committed);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let (source, target) = stores(500);
        let mut orch = orchestrator(&source, &target, settings(500, 200));
        let result = orch
            .run(&TransferRequest::new("src", TargetRef::SourceName))
            .await
            .unwrap();
        assert_eq!(result.strategy, Strategy::Large);
        assert_eq!(target.calls().replace, 0);

        let (source, target) = stores(499);
        let mut orch = orchestrator(&source, &target, settings(500, 200));
        let result = orch
            .run(&TransferRequest::new("src", TargetRef::SourceName))
            .await
            .unwrap();
        assert_eq!(result.strategy, Strategy::Small);
        assert_eq!(source.calls().export, 1);
        assert_eq!(target.calls().replace, 1);
        assert_eq!(target.calls().commit, 0);
        assert_eq!(target.rows(&result.target_dataset_id), rows(499));
    }

    #[tokio::test]
    async fn test_filter_count_decides_strategy() {
        let (source, target) = stores(1000);
        let mut orch = orchestrator(&source, &target, settings(500, 100));
        let request = TransferRequest::new("src", TargetRef::Name("March".into()))
            .with_filter(DateFilter::new("day", date(2024, 3, 1), date(2024, 3, 31)));
        let result = orch.run(&request).await.unwrap();

        let expected: Vec<Vec<String>> = rows(1000)
            .into_iter()
            .filter(|r| r[1].starts_with("2024-03-"))
            .collect();
        assert_eq!(result.strategy, Strategy::Small);
        assert_eq!(result.rows_copied, expected.len() as u64);
        assert_eq!(target.rows(&result.target_dataset_id), expected);
        assert_eq!(source.calls().export, 0);
        assert!(result.filter.unwrap().contains("day"));
    }

    #[tokio::test]
    async fn test_filtered_large_path_stays_in_range() {
        let (source, target) = stores(2400);
        let mut orch = orchestrator(&source, &target, settings(100, 64));
        let request = TransferRequest::new("src", TargetRef::Name("H1".into()))
            .with_filter(DateFilter::new("day", date(2024, 1, 1), date(2024, 6, 30)));
        let result = orch.run(&request).await.unwrap();

        assert_eq!(result.strategy, Strategy::Large);
        assert_eq!(result.rows_copied, 1200);
        let copied = target.rows(&result.target_dataset_id);
        assert_eq!(copied.len(), 1200);
        assert!(copied.iter().all(|r| r[1].as_str() <= "2024-06-30"));
        assert_eq!(source.calls().query_pages, 1200usize.div_ceil(64));
    }

    #[tokio::test]
    async fn test_unknown_filter_column_copies_everything() {
        let (source, target) = stores(30);
        let mut orch = orchestrator(&source, &target, settings(500, 10));
        let request = TransferRequest::new("src", TargetRef::SourceName)
            .with_filter(DateFilter::new("shipped", date(2024, 1, 1), date(2024, 1, 2)));
        let result = orch.run(&request).await.unwrap();
        assert_eq!(result.rows_copied, 30);
        assert!(result.filter.is_none());
        assert_eq!(orch.phase(), TransferPhase::Committed);
    }

    #[tokio::test]
    async fn test_inverted_range_copies_nothing() {
        let (source, target) = stores(30);
        let mut orch = orchestrator(&source, &target, settings(500, 10));
        let request = TransferRequest::new("src", TargetRef::SourceName)
            .with_filter(DateFilter::new("day", date(2024, 5, 1), date(2024, 1, 1)));
        let result = orch.run(&request).await.unwrap();
        assert_eq!(result.rows_copied, 0);
        assert!(target.rows(&result.target_dataset_id).is_empty());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let (source, target) = stores(50);
        let mut orch = orchestrator(&source, &target, settings(20, 15));
        let request = TransferRequest::new("src", TargetRef::Name("sales copy".into()));

        let first = orch.run(&request).await.unwrap();
        let after_first = target.rows(&first.target_dataset_id);
        let second = orch.run(&request).await.unwrap();

        assert!(first.created_target);
        assert!(!second.created_target);
        assert_eq!(first.target_dataset_id, second.target_dataset_id);
        assert_eq!(target.rows(&second.target_dataset_id), after_first);
        assert_eq!(target.dataset_count(), 1);
        assert_eq!(target.calls().create_stream, 1);

        let parts = target.uploaded_parts();
        let first_execution = parts[0].execution_id;
        let last_execution = parts[parts.len() - 1].execution_id;
        assert_ne!(first_execution, last_execution);
        assert_eq!(target.calls().create_execution, 2);
    }

    #[tokio::test]
    async fn test_numeric_values_identical_across_strategies() {
        let source = MemoryStore::new("source");
        let numbers = vec![
            Column::new("id", ColumnType::Long),
            Column::new("price", ColumnType::Decimal),
            Column::new("ratio", ColumnType::Double),
        ];
        let data: Vec<Vec<String>> = vec![
            vec!["9223372036854775808".into(), "12345678901234567.89".into(), "1.0".into()],
            vec!["2".into(), "0.10".into(), "-0.000001".into()],
            vec!["3".into(), "100.00".into(), "1e3".into()],
        ];
        source.add_dataset("src", "Prices", numbers, data.clone());
        let target = MemoryStore::new("target");

        let mut small = orchestrator(&source, &target, settings(1_000, 2));
        let small_result = small
            .run(&TransferRequest::new("src", TargetRef::Name("Prices Small".into())))
            .await
            .unwrap();
        let mut large = orchestrator(&source, &target, settings(1, 2));
        let large_result = large
            .run(&TransferRequest::new("src", TargetRef::Name("Prices Large".into())))
            .await
            .unwrap();

        assert_eq!(small_result.strategy, Strategy::Small);
        assert_eq!(large_result.strategy, Strategy::Large);
        assert_eq!(target.rows(&small_result.target_dataset_id), data);
        assert_eq!(target.rows(&large_result.target_dataset_id), data);
    }

    #[tokio::test]
    async fn test_existing_target_found_by_name() {
        let (source, target) = stores(10);
        target.add_dataset("existing", "SALES", columns(), rows(2));
        let mut orch = orchestrator(&source, &target, settings(500, 10));
        let result = orch
            .run(&TransferRequest::new("src", TargetRef::SourceName))
            .await
            .unwrap();
        assert_eq!(result.target_dataset_id, "existing");
        assert!(!result.created_target);
        assert_eq!(target.rows("existing"), rows(10));
    }

    #[tokio::test]
    async fn test_failed_part_leaves_target_unchanged() {
        let (source, target) = stores(50);
        target.add_dataset("t", "Sales", columns(), rows(3));
        target.fail(FailPoint::UploadPart(3));
        let mut orch = orchestrator(&source, &target, settings(10, 10));

        let err = orch
            .run(&TransferRequest::new("src", TargetRef::Id("t".into())))
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::StagedWrite { .. }));
        assert!(err.abort_error().is_none());
        assert_eq!(target.uploaded_parts().len(), 2);
        assert_eq!(target.calls().abort, 1);
        assert_eq!(target.calls().commit, 0);
        assert_eq!(target.rows("t"), rows(3));
        assert_eq!(target.open_executions(), 0);
        assert_eq!(orch.phase(), TransferPhase::Aborted);
    }

    #[tokio::test]
    async fn test_abort_failure_keeps_original_error() {
        let (source, target) = stores(50);
        target.add_dataset("t", "Sales", columns(), rows(3));
        target.fail(FailPoint::Commit);
        target.fail(FailPoint::Abort);
        let mut orch = orchestrator(&source, &target, settings(10, 10));

        let err = orch
            .run(&TransferRequest::new("src", TargetRef::Id("t".into())))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("commit"));
        assert!(err.abort_error().is_some());
        assert_eq!(target.rows("t"), rows(3));
    }

    #[tokio::test]
    async fn test_header_only_in_first_part() {
        let (source, target) = stores(95);
        let mut orch = orchestrator(&source, &target, settings(10, 20));
        orch.run(&TransferRequest::new("src", TargetRef::SourceName))
            .await
            .unwrap();

        let parts = target.uploaded_parts();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts.iter().map(|p| p.part).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert!(parts[0].body.starts_with("id,day,amount\n"));
        for part in &parts[1..] {
            assert!(!part.body.contains("id,day,amount"));
        }
    }

    #[tokio::test]
    async fn test_read_failure_writes_nothing() {
        let (source, target) = stores(100);
        source.fail(FailPoint::QueryPage(2));
        let mut orch = orchestrator(&source, &target, settings(10, 30));
        let err = orch
            .run(&TransferRequest::new("src", TargetRef::SourceName))
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::Api { .. }));
        assert_eq!(target.dataset_count(), 0);
        assert_eq!(target.calls().create_execution, 0);
        assert_eq!(orch.phase(), TransferPhase::Aborted);
    }

    #[tokio::test]
    async fn test_missing_target_id_fails() {
        let (source, target) = stores(10);
        let mut orch = orchestrator(&source, &target, settings(500, 10));
        let err = orch
            .run(&TransferRequest::new("src", TargetRef::Id("nope".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Api { status: 404, .. }));
        assert_eq!(target.calls().replace, 0);
        assert_eq!(source.calls().export, 0);
        assert_eq!(source.calls().query_pages, 0);
        assert_eq!(orch.phase(), TransferPhase::Aborted);
    }

    #[tokio::test]
    async fn test_missing_target_id_fails_before_large_read() {
        let (source, target) = stores(1200);
        let mut orch = orchestrator(&source, &target, settings(500, 100));
        let err = orch
            .run(&TransferRequest::new("src", TargetRef::Id("nope".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Api { status: 404, .. }));
        assert_eq!(source.calls().query_pages, 0);
        assert_eq!(target.calls().create_execution, 0);
    }

    #[derive(Default)]
    struct Recorder {
        fractions: Mutex<Vec<f64>>,
        statuses: Mutex<Vec<String>>,
    }

    impl ProgressReporter for Recorder {
        fn progress(&self, fraction: f64) {
            self.fractions.lock().unwrap().push(fraction);
        }

        fn status(&self, message: &str) {
            self.statuses.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_completes() {
        let (source, target) = stores(1500);
        let recorder = Arc::new(Recorder::default());
        let mut orch =
            orchestrator(&source, &target, settings(1000, 400)).with_progress(recorder.clone());
        orch.run(&TransferRequest::new("src", TargetRef::SourceName))
            .await
            .unwrap();

        let fractions = recorder.fractions.lock().unwrap().clone();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.last().copied(), Some(1.0));

        let statuses = recorder.statuses.lock().unwrap().clone();
        assert!(statuses.iter().any(|s| s.contains("1,500")));
        assert!(statuses.last().unwrap().starts_with("Copied 1,500 rows"));
    }

    #[test]
    fn test_result_json() {
        let now = Utc::now();
        let result = TransferResult {
            run_id: "r".into(),
            source_dataset_id: "s".into(),
            source_name: "S".into(),
            target_dataset_id: "t".into(),
            target_name: "T".into(),
            created_target: true,
            rows_copied: 3,
            strategy: Strategy::Large,
            filter: None,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
        };
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["strategy"], "large");
        assert_eq!(json["rows_copied"], 3);
        assert!(json.get("filter").is_none());
    }
}
