use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::transport::TransportOptions;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Outbound request behaviour shared by all sites.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Politeness limit per site (default: 20)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: None,
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl EngineConfig {
    pub fn transport_options(&self) -> TransportOptions {
        let defaults = TransportOptions::default();
        TransportOptions {
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_requests_per_minute() -> u32 {
    20
}

/// Where site definitions are read from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Directory of `*.json` / `*.toml` definition files
    #[serde(default = "default_definitions")]
    pub definitions: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            definitions: default_definitions(),
        }
    }
}

fn default_definitions() -> PathBuf {
    PathBuf::from("sites")
}

/// One activated site.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Definition id
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Mirror to use instead of the definition's first url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Credentials and keys (passkey, apikey, username, ...)
    #[serde(default)]
    pub user_input: BTreeMap<String, String>,
    /// Per-site politeness limit overriding the engine default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,
    /// Free-form metadata layer merged over the definition
    #[serde(default)]
    pub overrides: Value,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: true,
            url: None,
            user_input: BTreeMap::new(),
            requests_per_minute: None,
            overrides: Value::Null,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub registry: RegistryConfig,
    pub sites: Vec<SanitizedSiteConfig>,
}

/// Sanitized site config (user input values hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSiteConfig {
    pub id: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Names of the configured inputs, never their values
    pub user_input: Vec<String>,
    pub has_overrides: bool,
}

impl From<&SiteConfig> for SanitizedSiteConfig {
    fn from(site: &SiteConfig) -> Self {
        Self {
            id: site.id.clone(),
            enabled: site.enabled,
            url: site.url.clone(),
            user_input: site.user_input.keys().cloned().collect(),
            has_overrides: !site.overrides.is_null(),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            engine: config.engine.clone(),
            registry: config.registry.clone(),
            sites: config.sites.iter().map(SanitizedSiteConfig::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(config.engine.requests_per_minute, 20);
        assert_eq!(config.registry.definitions.to_str().unwrap(), "sites");
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_deserialize_sites() {
        let toml = r#"
[engine]
user_agent = "custom/1.0"

[[sites]]
id = "alpha"
requests_per_minute = 5

[[sites]]
id = "beta"
enabled = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[0].requests_per_minute, Some(5));
        assert!(config.sites[0].overrides.is_null());
        assert!(!config.sites[1].enabled);
        assert_eq!(config.engine.transport_options().user_agent, "custom/1.0");
    }

    #[test]
    fn test_site_without_id_fails() {
        let toml = r#"
[[sites]]
enabled = true
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_user_input() {
        let mut site = SiteConfig {
            id: "alpha".into(),
            ..SiteConfig::default()
        };
        site.user_input.insert("passkey".into(), "secret-passkey".into());
        let config = Config {
            sites: vec![site],
            ..Config::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.sites[0].user_input, vec!["passkey".to_string()]);
        assert!(!sanitized.sites[0].has_overrides);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-passkey"));
    }
}
