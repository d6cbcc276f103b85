//! Domain name minting.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::{Error, Result};

/// Mint an unguessable domain name from `bytes` bytes of OS randomness.
///
/// The URL-safe alphabet keeps `/` out of the name, so it can sit in the
/// authority part of a capability URI.
pub fn mint_domain_name(bytes: usize) -> Result<String> {
    let mut buf = vec![0u8; bytes];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| Error::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_url_safe_and_sized() {
        let name = mint_domain_name(42).unwrap();
        assert_eq!(name.len(), 56);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn names_differ() {
        assert_ne!(mint_domain_name(32).unwrap(), mint_domain_name(32).unwrap());
    }
}
