//! Capability identifiers.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A remote-addressable capability identifier: `scheme://authority/token`.
///
/// The `scheme://authority/` part names the domain and is the routing key;
/// the token names one exported actor within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityUri {
    scheme: String,
    authority: String,
    token: String,
}

impl CapabilityUri {
    pub fn new(prefix: &str, token: impl Into<String>) -> Result<Self> {
        let (scheme, authority) = split_prefix(prefix)?;
        let token = token.into();
        if token.is_empty() || token.contains('/') {
            return Err(Error::InvalidUri(format!("{prefix}{token}")));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            authority: authority.to_string(),
            token,
        })
    }

    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = || Error::InvalidUri(uri.to_string());
        let (scheme, rest) = uri.split_once("://").ok_or_else(invalid)?;
        let (authority, token) = rest.split_once('/').ok_or_else(invalid)?;
        if scheme.is_empty() || authority.is_empty() || token.is_empty() || token.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            scheme: scheme.to_string(),
            authority: authority.to_string(),
            token: token.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The domain name part.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The domain prefix, `scheme://authority/`.
    pub fn prefix(&self) -> String {
        format!("{}://{}/", self.scheme, self.authority)
    }
}

impl fmt::Display for CapabilityUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.authority, self.token)
    }
}

impl FromStr for CapabilityUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check that `prefix` has the shape `scheme://authority/`.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    split_prefix(prefix).map(|_| ())
}

fn split_prefix(prefix: &str) -> Result<(&str, &str)> {
    let invalid = || Error::InvalidUri(prefix.to_string());
    let (scheme, rest) = prefix.split_once("://").ok_or_else(invalid)?;
    let authority = rest.strip_suffix('/').ok_or_else(invalid)?;
    if scheme.is_empty() || authority.is_empty() || authority.contains('/') {
        return Err(invalid());
    }
    Ok((scheme, authority))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let uri = CapabilityUri::parse("ansible://abc-_DEF/token").unwrap();
        assert_eq!(uri.scheme(), "ansible");
        assert_eq!(uri.authority(), "abc-_DEF");
        assert_eq!(uri.token(), "token");
        assert_eq!(uri.prefix(), "ansible://abc-_DEF/");
        assert_eq!(uri.to_string(), "ansible://abc-_DEF/token");
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "ansible://",
            "ansible://name",
            "ansible://name/",
            "ansible://name/a/b",
            "://name/token",
            "name/token",
        ] {
            assert!(CapabilityUri::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn prefix_validation() {
        assert!(validate_prefix("ocap://test/").is_ok());
        assert!(validate_prefix("ocap://test").is_err());
        assert!(validate_prefix("ocap://te/st/").is_err());
    }

    #[test]
    fn new_joins_prefix_and_token() {
        let uri = CapabilityUri::new("ocap://test/", "abc").unwrap();
        assert_eq!(uri.to_string(), "ocap://test/abc");
        assert!(CapabilityUri::new("ocap://test/", "").is_err());
    }
}
