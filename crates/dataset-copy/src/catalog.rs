//! Cached dataset listing.
//!
//! Listing every dataset on an instance costs several paginated calls, so the
//! result is kept for a bounded time. The cache is owned by whoever drives
//! transfers and is invalidated after each successful write, so a dataset
//! created by one transfer is visible to the next name lookup.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::DatasetApi;
use crate::core::DatasetSummary;
use crate::error::Result;

struct CachedListing {
    fetched_at: Instant,
    datasets: Vec<DatasetSummary>,
}

/// TTL-bounded listing cache for one instance.
pub struct DatasetCache {
    ttl: Duration,
    entry: Option<CachedListing>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Whether a cached listing exists and is younger than the TTL.
    pub fn is_fresh(&self) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| e.fetched_at.elapsed() < self.ttl)
    }

    /// Drop the cached listing.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("dataset listing cache invalidated");
        }
    }

    /// The listing, fetched through `api` when missing or expired.
    pub async fn list<A: DatasetApi + ?Sized>(&mut self, api: &A) -> Result<&[DatasetSummary]> {
        if !self.is_fresh() {
            let datasets = api.list_datasets().await?;
            debug!("{}: cached {} datasets", api.instance(), datasets.len());
            self.entry = Some(CachedListing {
                fetched_at: Instant::now(),
                datasets,
            });
        }
        Ok(self
            .entry
            .as_ref()
            .map(|e| e.datasets.as_slice())
            .unwrap_or(&[]))
    }

    /// Case-insensitive name lookup. The first match wins.
    pub async fn find_by_name<A: DatasetApi + ?Sized>(
        &mut self,
        api: &A,
        name: &str,
    ) -> Result<Option<DatasetSummary>> {
        let wanted = name.to_lowercase();
        let matches: Vec<&DatasetSummary> = self
            .list(api)
            .await?
            .iter()
            .filter(|d| d.name.to_lowercase() == wanted)
            .collect();

        if matches.len() > 1 {
            warn!(
                "{} datasets are named '{}', using {}",
                matches.len(),
                name,
                matches[0].id
            );
        }
        Ok(matches.first().map(|d| (*d).clone()))
    }
}

/// Datasets whose name contains `text`, ignoring case.
pub fn filter_by_name<'a>(datasets: &'a [DatasetSummary], text: &str) -> Vec<&'a DatasetSummary> {
    let needle = text.to_lowercase();
    datasets
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .collect()
}
