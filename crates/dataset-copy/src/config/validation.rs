//! Configuration validation.

use super::{Config, EndpointConfig};
use crate::error::{CopyError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_endpoint("source", &config.source)?;
    validate_endpoint("target", &config.target)?;

    if config.source.base_url() == config.target.base_url() {
        return Err(CopyError::Config(
            "source and target cannot be the same instance".into(),
        ));
    }

    let transfer = &config.transfer;
    if let Some(0) = transfer.page_size {
        return Err(CopyError::Config(
            "transfer.page_size must be at least 1".into(),
        ));
    }
    if let Some(0) = transfer.part_size {
        return Err(CopyError::Config(
            "transfer.part_size must be at least 1".into(),
        ));
    }
    if let Some(0) = transfer.small_transfer_threshold {
        return Err(CopyError::Config(
            "transfer.small_transfer_threshold must be at least 1".into(),
        ));
    }
    if let Some(0) = transfer.request_timeout_secs {
        return Err(CopyError::Config(
            "transfer.request_timeout_secs must be at least 1".into(),
        ));
    }
    if let Some(0) = transfer.bulk_timeout_secs {
        return Err(CopyError::Config(
            "transfer.bulk_timeout_secs must be at least 1".into(),
        ));
    }

    Ok(())
}

fn validate_endpoint(side: &str, endpoint: &EndpointConfig) -> Result<()> {
    if endpoint.instance.trim().is_empty() && endpoint.base_url.is_none() {
        return Err(CopyError::Config(format!(
            "{}.instance or {}.base_url is required",
            side, side
        )));
    }
    if let Some(url) = &endpoint.base_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(CopyError::Config(format!(
                "{}.base_url must start with http:// or https://, got '{}'",
                side, url
            )));
        }
    }
    if endpoint.token.is_empty() && endpoint.token_env.is_none() {
        return Err(CopyError::Config(format!(
            "{}.token or {}.token_env is required",
            side, side
        )));
    }
    Ok(())
}
