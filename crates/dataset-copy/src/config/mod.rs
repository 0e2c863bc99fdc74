//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{CopyError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl EndpointConfig {
    /// Base URL for API calls, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.domo.com", self.instance),
        }
    }

    /// Resolve the token, reading `token_env` when no inline token is set.
    pub fn resolve_token(&self) -> Result<String> {
        if !self.token.is_empty() {
            return Ok(self.token.clone());
        }
        let var = self.token_env.as_deref().ok_or_else(|| {
            CopyError::Config(format!("no token configured for instance {}", self.instance))
        })?;
        std::env::var(var).map_err(|_| {
            CopyError::Config(format!(
                "environment variable {} is not set (token for instance {})",
                var, self.instance
            ))
        })
    }
}
