//! Error types for the transfer engine.

use thiserror::Error;

/// Main error type for transfer operations.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error {status} from {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Dataset metadata could not be fetched or was malformed.
    #[error("Metadata error for dataset {dataset}: {message}")]
    Metadata { dataset: String, message: String },

    /// A row or response did not line up with the resolved schema.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// Reading or staging failed for a dataset.
    #[error("Transfer failed for dataset {dataset}: {message}")]
    Transfer { dataset: String, message: String },

    /// A multi-part staged write failed. The original failure is `source`;
    /// `abort_error` is set when the best-effort abort also failed.
    #[error("{source}")]
    StagedWrite {
        execution_id: i64,
        #[source]
        source: Box<CopyError>,
        abort_error: Option<String>,
    },

    /// IO error (spill file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text encode/decode error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CopyError {
    /// Create an Api error for a non-success response.
    pub fn api(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        CopyError::Api {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a Metadata error
    pub fn metadata(dataset: impl Into<String>, message: impl Into<String>) -> Self {
        CopyError::Metadata {
            dataset: dataset.into(),
            message: message.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(dataset: impl Into<String>, message: impl Into<String>) -> Self {
        CopyError::Transfer {
            dataset: dataset.into(),
            message: message.into(),
        }
    }

    /// Failure of the best-effort abort that followed a staged write error, if any.
    pub fn abort_error(&self) -> Option<&str> {
        match self {
            CopyError::StagedWrite { abort_error, .. } => abort_error.as_deref(),
            _ => None,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CopyError::Config(_) | CopyError::Yaml(_) => 2,
            CopyError::Http(_) | CopyError::Api { .. } | CopyError::Metadata { .. } => 3,
            CopyError::StagedWrite { .. } => 4,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        if let Some(abort) = self.abort_error() {
            output.push_str(&format!("\nAbort also failed: {}", abort));
        }

        output
    }
}

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, CopyError>;
