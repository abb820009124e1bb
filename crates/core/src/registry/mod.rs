//! Site definitions on disk and their activation into [`Site`]s.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, SiteConfig};
use crate::metadata::{merge_layers, MetadataError};
use crate::site::{Site, SiteHooks};
use crate::throttle::{RequestThrottle, TokenBucketThrottle};
use crate::transport::{ReqwestTransport, Transport, TransportError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Definition has no id: {0}")]
    MissingId(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Site '{site}': {source}")]
    Metadata {
        site: String,
        #[source]
        source: MetadataError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Known site definitions, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    definitions: BTreeMap<String, Value>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` and `*.toml` file in `dir`.
    ///
    /// Files with other extensions are ignored; a malformed file fails the
    /// whole load.
    pub fn load_dir(dir: &Path) -> Result<Self, RegistryError> {
        let io = |source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| matches!(extension(path), Some("json" | "toml")))
            .collect();
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            let definition = read_definition(&path)?;
            registry.insert(definition).map_err(|e| match e {
                RegistryError::MissingId(_) => RegistryError::MissingId(path.display().to_string()),
                other => other,
            })?;
        }
        info!(dir = %dir.display(), count = registry.len(), "Loaded site definitions");
        Ok(registry)
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, definition: Value) -> Result<(), RegistryError> {
        let id = definition
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| RegistryError::MissingId("<inline>".to_string()))?
            .to_string();
        if self.definitions.insert(id.clone(), definition).is_some() {
            warn!(site = %id, "Replacing site definition");
        }
        Ok(())
    }

    pub fn definition(&self, id: &str) -> Option<&Value> {
        self.definitions.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Activate one configured site.
    pub fn build_site(
        &self,
        config: &SiteConfig,
        hooks: SiteHooks,
        transport: Arc<dyn Transport>,
    ) -> Result<Site, RegistryError> {
        let definition = self
            .definition(&config.id)
            .ok_or_else(|| RegistryError::UnknownSite(config.id.clone()))?;
        let user = user_layer(config);
        Site::from_definition(definition, Some(&user), hooks, transport).map_err(|source| {
            RegistryError::Metadata {
                site: config.id.clone(),
                source,
            }
        })
    }

    /// Activate every enabled site of `sites` over one shared HTTP client
    /// and one politeness throttle.
    pub fn build_sites(
        &self,
        sites: &[SiteConfig],
        engine: &EngineConfig,
    ) -> Result<Vec<Site>, RegistryError> {
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(&engine.transport_options())?);

        let mut throttle = TokenBucketThrottle::new(engine.requests_per_minute);
        for site in sites {
            if let Some(rate) = site.requests_per_minute {
                throttle = throttle.with_site_rate(site.id.clone(), rate);
            }
        }
        let throttle: Arc<dyn RequestThrottle> = Arc::new(throttle);

        sites
            .iter()
            .filter(|site| site.enabled)
            .map(|config| {
                let site = self
                    .build_site(config, SiteHooks::new(), transport.clone())?
                    .with_throttle(throttle.clone());
                debug!(site = %site.id(), schema = %site.metadata().schema, "Activated site");
                Ok(site)
            })
            .collect()
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn read_definition(path: &Path) -> Result<Value, RegistryError> {
    let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| RegistryError::Parse {
        path: path.to_path_buf(),
        message,
    };
    match extension(path) {
        Some("toml") => toml::from_str::<Value>(&text).map_err(|e| parse_error(e.to_string())),
        _ => serde_json::from_str::<Value>(&text).map_err(|e| parse_error(e.to_string())),
    }
}

/// The user merge layer: free-form overrides, then the custom mirror and
/// credentials on top.
pub fn user_layer(config: &SiteConfig) -> Value {
    let mut explicit = json!({});
    if let Some(url) = &config.url {
        explicit["urls"] = json!([url]);
    }
    if !config.user_input.is_empty() {
        explicit["userInput"] = json!(config.user_input);
    }
    let overrides = match &config.overrides {
        Value::Object(_) => config.overrides.clone(),
        _ => json!({}),
    };
    merge_layers(overrides, &[&explicit])
}
