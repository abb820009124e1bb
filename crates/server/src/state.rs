use std::collections::BTreeMap;
use trackhub_core::{Config, SanitizedConfig, Site};

/// Shared application state
pub struct AppState {
    config: Config,
    sites: BTreeMap<String, Site>,
}

impl AppState {
    pub fn new(config: Config, sites: Vec<Site>) -> Self {
        let sites = sites
            .into_iter()
            .map(|site| (site.id().to_string(), site))
            .collect();
        Self { config, sites }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn site(&self, id: &str) -> Option<&Site> {
        self.sites.get(id)
    }

    /// Active sites ordered by id.
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }
}
