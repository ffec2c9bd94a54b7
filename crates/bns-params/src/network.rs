//! Bitcoin network definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network type enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Bitcoin mainnet
    #[default]
    #[serde(alias = "bitcoin")]
    Mainnet,
    /// Bitcoin testnet
    Testnet,
    /// Regtest (local development)
    Regtest,
}

impl NetworkType {
    /// All supported networks
    pub const ALL: [NetworkType; 3] = [
        NetworkType::Mainnet,
        NetworkType::Testnet,
        NetworkType::Regtest,
    ];
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Network::from_type(*self).name)
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" | "main" => Ok(NetworkType::Mainnet),
            "testnet" | "test" => Ok(NetworkType::Testnet),
            "regtest" => Ok(NetworkType::Regtest),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Human-readable name
    pub name: &'static str,
    /// Bech32 human-readable part for segwit addresses
    pub bech32_hrp: &'static str,
    /// Base58 version byte for P2PKH addresses
    pub p2pkh_prefix: u8,
    /// Base58 version byte for P2SH addresses
    pub p2sh_prefix: u8,
    /// Coin type (BIP-44), used for key derivation paths
    pub coin_type: u32,
    /// Default esplora-compatible API base path
    pub default_api_path: &'static str,
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "mainnet",
            bech32_hrp: "bc",
            p2pkh_prefix: 0x00,
            p2sh_prefix: 0x05,
            coin_type: 0,
            default_api_path: "https://blockstream.info/api",
        }
    }

    /// Get testnet parameters
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            name: "testnet",
            bech32_hrp: "tb",
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            coin_type: 1,
            default_api_path: "https://blockstream.info/testnet/api",
        }
    }

    /// Get regtest parameters
    pub const fn regtest() -> Self {
        Self {
            network_type: NetworkType::Regtest,
            name: "regtest",
            bech32_hrp: "bcrt",
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            coin_type: 1,
            default_api_path: "http://127.0.0.1:3002",
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
            NetworkType::Regtest => Self::regtest(),
        }
    }

    /// Resolve a network from the bech32 human-readable part of an address
    pub fn from_bech32_hrp(hrp: &str) -> Option<Self> {
        NetworkType::ALL
            .into_iter()
            .map(Self::from_type)
            .find(|n| n.bech32_hrp.eq_ignore_ascii_case(hrp))
    }

    /// Check whether a base58 version byte belongs to this network
    pub const fn owns_base58_prefix(&self, prefix: u8) -> bool {
        prefix == self.p2pkh_prefix || prefix == self.p2sh_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_params() {
        let net = Network::mainnet();
        assert_eq!(net.network_type, NetworkType::Mainnet);
        assert_eq!(net.bech32_hrp, "bc");
        assert_eq!(net.coin_type, 0);
        assert!(net.owns_base58_prefix(0x05));
        assert!(!net.owns_base58_prefix(0x6f));
    }

    #[test]
    fn test_network_from_type() {
        let net = Network::from_type(NetworkType::Testnet);
        assert_eq!(net.network_type, NetworkType::Testnet);
        assert_eq!(net.bech32_hrp, "tb");
    }

    #[test]
    fn test_network_names_parse() {
        assert_eq!("bitcoin".parse::<NetworkType>().unwrap(), NetworkType::Mainnet);
        assert_eq!("Testnet".parse::<NetworkType>().unwrap(), NetworkType::Testnet);
        assert!("litecoin".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_from_bech32_hrp() {
        assert_eq!(
            Network::from_bech32_hrp("bcrt").map(|n| n.network_type),
            Some(NetworkType::Regtest)
        );
        assert!(Network::from_bech32_hrp("ltc").is_none());
    }

    #[test]
    fn test_network_serde_accepts_original_names() {
        let parsed: NetworkType = serde_json::from_str("\"bitcoin\"").unwrap();
        assert_eq!(parsed, NetworkType::Mainnet);
        assert_eq!(serde_json::to_string(&NetworkType::Testnet).unwrap(), "\"testnet\"");
    }
}
