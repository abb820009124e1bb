use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::registry::SiteRegistry;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Politeness rates are positive
/// - Site ids are non-empty and unique
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.engine.requests_per_minute == 0 {
        return Err(ConfigError::ValidationError(
            "engine.requests_per_minute must be positive".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in &config.sites {
        if site.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sites[].id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(site.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "site '{}' is configured twice",
                site.id
            )));
        }
        if site.requests_per_minute == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "site '{}': requests_per_minute must be positive",
                site.id
            )));
        }
    }

    Ok(())
}

/// Every enabled site must have a definition in `registry`.
pub fn validate_sites(config: &Config, registry: &SiteRegistry) -> Result<(), ConfigError> {
    let missing: Vec<&str> = config
        .sites
        .iter()
        .filter(|site| site.enabled && registry.definition(&site.id).is_none())
        .map(|site| site.id.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "no definition for site(s): {}",
            missing.join(", ")
        )))
    }
}
