//! Configuration loading from stepbox.toml.

use sandbox::SandboxConfig;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// How sandboxes are built.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// The host side of the demo.
    #[serde(default)]
    pub host: HostConfig,
}

/// Host domain configuration.
#[derive(Debug, Deserialize)]
pub struct HostConfig {
    /// Prefix of the host's own domain, `scheme://authority/`.
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
        }
    }
}

fn default_domain() -> String {
    "ocap://host/".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config
            .sandbox
            .validate()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.host.domain, "ocap://host/");
        assert_eq!(config.sandbox, SandboxConfig::default());
    }

    #[test]
    fn tables_override_defaults() {
        let config = Config::parse(
            r#"
            [sandbox]
            scheme = "ocap"
            expose_effect = false

            [host]
            domain = "ocap://me/"
            "#,
        )
        .unwrap();
        assert_eq!(config.sandbox.scheme, "ocap");
        assert_eq!(config.sandbox.name_bytes, 42);
        assert!(!config.sandbox.expose_effect);
        assert_eq!(config.host.domain, "ocap://me/");
    }

    #[test]
    fn invalid_sandbox_settings_are_rejected() {
        let err = Config::parse("[sandbox]\nname_bytes = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load_or_default("/nonexistent/stepbox.toml").unwrap();
        assert_eq!(config.host.domain, "ocap://host/");
    }
}
