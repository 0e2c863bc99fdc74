//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Instance the dataset is read from.
    pub source: EndpointConfig,

    /// Instance the dataset is written to.
    pub target: EndpointConfig,

    /// Transfer behavior configuration.
    #[serde(default)]
    pub transfer: TransferSettings,
}

/// One data-store instance reachable over HTTP.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Instance name, e.g. "acme" for `https://acme.domo.com`.
    #[serde(default)]
    pub instance: String,

    /// Explicit base URL. Derived from `instance` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Developer token sent with every request.
    #[serde(default)]
    pub token: String,

    /// Environment variable holding the token, used when `token` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("instance", &self.instance)
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("token_env", &self.token_env)
            .finish()
    }
}

/// Transfer behavior configuration.
/// Fields are Option<T> so that "not set" falls back to the documented default
/// through the `get_*` accessors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransferSettings {
    /// Post-filter row count at or above which the paginated/staged path is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_transfer_threshold: Option<u64>,

    /// Rows requested per page on the paginated path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,

    /// Rows per uploaded part on the staged path. Defaults to `page_size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_size: Option<usize>,

    /// Timeout for metadata, listing and staging-channel control calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Timeout for calls that move rows: export, query, replace, part upload and commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_timeout_secs: Option<u64>,

    /// How long a dataset listing stays cached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_ttl_secs: Option<u64>,

    /// Directory for the spill file. System temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spill_dir: Option<PathBuf>,
}

impl TransferSettings {
    pub fn get_small_transfer_threshold(&self) -> u64 {
        self.small_transfer_threshold.unwrap_or(500_000)
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size.unwrap_or(100_000)
    }

    pub fn get_part_size(&self) -> usize {
        self.part_size.unwrap_or_else(|| self.get_page_size())
    }

    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(60))
    }

    pub fn get_bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs.unwrap_or(300))
    }

    pub fn get_listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs.unwrap_or(300))
    }
}
