//! Sandbox configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Smallest accepted domain name size, in random bytes (256 bits).
pub const MIN_NAME_BYTES: usize = 32;

/// How sandboxes are named and which capabilities they expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// URI scheme of both domains.
    pub scheme: String,

    /// Random bytes per domain name.
    pub name_bytes: usize,

    /// Whether the bundle carries the `effect` capability.
    pub expose_effect: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            scheme: "ansible".to_string(),
            name_bytes: 42,
            expose_effect: true,
        }
    }
}

impl SandboxConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name_bytes < MIN_NAME_BYTES {
            return Err(Error::Config(format!(
                "name_bytes must be at least {MIN_NAME_BYTES}, got {}",
                self.name_bytes
            )));
        }
        let mut chars = self.scheme.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(Error::Config(format!("invalid scheme '{}'", self.scheme)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.scheme, "ansible");
        assert_eq!(config.name_bytes, 42);
        assert!(config.expose_effect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        let config = SandboxConfig::from_toml("expose_effect = false").unwrap();
        assert_eq!(config.scheme, "ansible");
        assert!(!config.expose_effect);
    }

    #[test]
    fn rejects_weak_names() {
        let err = SandboxConfig::from_toml("name_bytes = 16").unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn rejects_bad_scheme() {
        assert!(SandboxConfig::from_toml(r#"scheme = "9p""#).is_err());
        assert!(SandboxConfig::from_toml(r#"scheme = "a/b""#).is_err());
        assert!(SandboxConfig::from_toml(r#"scheme = "ocap+test""#).is_ok());
    }
}
