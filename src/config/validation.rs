use crate::config::types::{
    CatalogConfig, HarvestConfig, IdentityConfig, OutputConfig, PacingConfig, RetryConfig,
    TargetsConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &HarvestConfig) -> Result<(), ConfigError> {
    validate_workers(config.harvest.workers)?;
    validate_catalog_config(&config.catalog)?;
    validate_targets_config(&config.targets)?;
    validate_retry_config(&config.retry)?;
    validate_pacing_config(&config.pacing)?;
    validate_identity_config(&config.identity)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the worker count
pub fn validate_workers(workers: u32) -> Result<(), ConfigError> {
    if workers < 1 || workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            workers
        )));
    }
    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.selector_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "selector-timeout-ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates the make list and year range
fn validate_targets_config(config: &TargetsConfig) -> Result<(), ConfigError> {
    if config.makes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one make is required".to_string(),
        ));
    }

    for make in &config.makes {
        validate_slug(make)?;
    }

    if config.first_year > config.last_year {
        return Err(ConfigError::Validation(format!(
            "first-year ({}) must not be after last-year ({})",
            config.first_year, config.last_year
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

/// Validates pacing windows
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.between_targets_min_ms > config.between_targets_max_ms {
        return Err(ConfigError::Validation(format!(
            "between-targets-min-ms ({}) must not exceed between-targets-max-ms ({})",
            config.between_targets_min_ms, config.between_targets_max_ms
        )));
    }

    Ok(())
}

/// Validates the identity pool
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "identity needs at least one non-empty user agent".to_string(),
        ));
    }

    if config.viewports.is_empty() {
        return Err(ConfigError::Validation(
            "identity needs at least one viewport".to_string(),
        ));
    }

    if let Some(vp) = config
        .viewports
        .iter()
        .find(|vp| vp.width == 0 || vp.height == 0)
    {
        return Err(ConfigError::Validation(format!(
            "viewport {}x{} has a zero dimension",
            vp.width, vp.height
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results-dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a catalog identifier: lowercase alphanumerics and hyphens
fn validate_slug(slug: &str) -> Result<(), ConfigError> {
    if slug.is_empty() {
        return Err(ConfigError::Validation("make cannot be empty".to_string()));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "make '{}' must contain only lowercase letters, digits and hyphens",
            slug
        )));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ConfigError::Validation(format!(
            "make '{}' cannot start or end with '-'",
            slug
        )));
    }

    Ok(())
}
