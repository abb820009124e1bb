use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with `TRACKHUB_` environment overrides
/// (`TRACKHUB_SERVER_PORT=9000`). `TRACKHUB_CONFIG` names the file and is
/// not an override.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TRACKHUB_").ignore(&["CONFIG"]).split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[[sites]]
id = "demo"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.sites.len(), 1);
        assert!(config.sites[0].enabled);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[engine]
requests_per_minute = "fast"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/trackhub.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[registry]
definitions = "/etc/trackhub/sites"

[[sites]]
id = "demo"
url = "https://mirror.example/"

[sites.user_input]
passkey = "abc"

[sites.overrides.search.requestConfig.params]
incldead = 0
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.registry.definitions.to_str(), Some("/etc/trackhub/sites"));

        let site = &config.sites[0];
        assert_eq!(site.url.as_deref(), Some("https://mirror.example/"));
        assert_eq!(site.user_input["passkey"], "abc");
        assert_eq!(site.overrides["search"]["requestConfig"]["params"]["incldead"], 0);
    }
}
