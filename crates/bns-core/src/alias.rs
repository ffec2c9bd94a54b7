//! Domain aliases and their notification addresses
//!
//! An alias never lives in a registry. Everything known about it is found
//! by scanning the transactions paying its notification address, a P2WSH
//! address derived one-way from the alias name.

use crate::script::{p2wsh_address, push_data, OP_1, OP_DROP};
use crate::{Error, Result};
use bns_params::{NetworkType, DEFAULT_EXTENSION};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Human-readable domain alias (`name` + `extension`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Alias {
    name: String,
    extension: String,
}

impl Alias {
    /// Create alias from name and extension (extension includes the dot)
    pub fn new(name: &str, extension: &str) -> Result<Self> {
        let name = name.trim().to_lowercase();
        let extension = extension.trim().to_lowercase();

        if name.is_empty() {
            return Err(Error::InvalidAlias("Alias name cannot be empty".to_string()));
        }
        if name.starts_with('.') {
            return Err(Error::InvalidAlias(format!(
                "Alias '{}' cannot start with a dot",
                name
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidAlias(format!(
                "Alias '{}' contains whitespace or control characters",
                name
            )));
        }
        if !extension.starts_with('.')
            || extension.len() < 2
            || extension[1..].contains('.')
            || extension.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(Error::InvalidAlias(format!(
                "Extension '{}' must be a single dot followed by a label",
                extension
            )));
        }

        Ok(Self { name, extension })
    }

    /// Parse `name.ext`; names without a dot get the default extension
    pub fn parse(full_name: &str) -> Result<Self> {
        let trimmed = full_name.trim();
        match trimmed.rfind('.') {
            Some(dot) if dot > 0 => Self::new(&trimmed[..dot], &trimmed[dot..]),
            _ => Self::new(trimmed, DEFAULT_EXTENSION),
        }
    }

    /// Alias name without extension
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension including the leading dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Full domain name (`name` + `extension`)
    pub fn full_name(&self) -> String {
        format!("{}{}", self.name, self.extension)
    }

    /// Derive the notification address on a network
    pub fn notification_address(&self, network: NetworkType) -> Result<NotificationAddress> {
        NotificationAddress::derive(self, network)
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.extension)
    }
}

/// Address every state-changing transaction for an alias must pay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAddress {
    address: String,
    network: NetworkType,
    #[serde(with = "crate::serde_hex")]
    witness_script: Vec<u8>,
}

impl NotificationAddress {
    /// Derive from alias and network
    ///
    /// Witness script: `<sha256(full name)> OP_DROP OP_TRUE`.
    pub fn derive(alias: &Alias, network: NetworkType) -> Result<Self> {
        let name_hash = Sha256::digest(alias.full_name().as_bytes());

        let mut witness_script = Vec::with_capacity(35);
        push_data(&mut witness_script, &name_hash);
        witness_script.push(OP_DROP);
        witness_script.push(OP_1);

        let address = p2wsh_address(&witness_script, network)?;

        tracing::debug!("Notification address for {} on {}: {}", alias, network, address);

        Ok(Self {
            address,
            network,
            witness_script,
        })
    }

    /// Encoded address
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Network the address belongs to
    pub fn network(&self) -> NetworkType {
        self.network
    }

    /// Witness script committed to by the address
    pub fn witness_script(&self) -> &[u8] {
        &self.witness_script
    }
}

impl fmt::Display for NotificationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_extension() {
        let alias = Alias::parse("Satoshi.BTC").unwrap();
        assert_eq!(alias.name(), "satoshi");
        assert_eq!(alias.extension(), ".btc");
        assert_eq!(alias.full_name(), "satoshi.btc");
    }

    #[test]
    fn test_parse_without_extension_uses_default() {
        let alias = Alias::parse("satoshi").unwrap();
        assert_eq!(alias.to_string(), "satoshi.btc");
    }

    #[test]
    fn test_invalid_aliases() {
        assert!(Alias::parse("").is_err());
        assert!(Alias::parse("two words.btc").is_err());
        assert!(Alias::new("name", "btc").is_err());
        assert!(Alias::new("name", ".").is_err());
    }

    #[test]
    fn test_leading_dot_rejected() {
        assert!(matches!(Alias::parse(".btc"), Err(Error::InvalidAlias(_))));
        assert!(matches!(Alias::parse(" .btc "), Err(Error::InvalidAlias(_))));
        assert!(Alias::new(".satoshi", ".btc").is_err());
    }

    #[test]
    fn test_notification_address_is_deterministic() {
        let alias = Alias::parse("satoshi.btc").unwrap();
        let a = alias.notification_address(NetworkType::Mainnet).unwrap();
        let b = alias.notification_address(NetworkType::Mainnet).unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("bc1q"));
        assert_eq!(a.witness_script().len(), 35);
    }

    #[test]
    fn test_notification_address_is_network_scoped() {
        let alias = Alias::parse("satoshi.btc").unwrap();
        let main = alias.notification_address(NetworkType::Mainnet).unwrap();
        let test = alias.notification_address(NetworkType::Testnet).unwrap();
        assert!(test.as_str().starts_with("tb1q"));
        assert_ne!(main.as_str(), test.as_str());
    }

    #[test]
    fn test_different_aliases_get_different_addresses() {
        let a = Alias::parse("alice.btc").unwrap();
        let b = Alias::parse("bob.btc").unwrap();
        assert_ne!(
            a.notification_address(NetworkType::Mainnet).unwrap(),
            b.notification_address(NetworkType::Mainnet).unwrap()
        );
    }
}
