//! Configuration for resolution, transaction building and backups

use crate::backup::BackupPolicy;
use crate::Result;
use bns_params::{
    Network, NetworkType, ProtocolParams, DEFAULT_FEE_RATE, DEFAULT_LOCKTIME, DEFAULT_MAX_FEE_RATE,
    DEFAULT_MIN_FEE_RATE, DEFAULT_MIN_OUTPUT_VALUE, DEFAULT_TX_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Domain resolution rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum payment to the notification address for a claim (sats)
    pub min_claim_value: u64,
    /// Blocks between a claim and the domain becoming active
    pub activation_delay: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_claim_value: DEFAULT_MIN_OUTPUT_VALUE,
            activation_delay: 0,
        }
    }
}

/// Defaults applied to new transaction descriptors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderDefaults {
    /// Transaction version
    pub version: i32,
    /// Transaction locktime
    pub locktime: u32,
    /// Requested fee rate (sat/vB)
    pub fee_rate: f64,
    /// Lower fee-rate bound (sat/vB)
    pub min_fee_rate: f64,
    /// Upper fee-rate bound (sat/vB)
    pub max_fee_rate: f64,
    /// Dust limit (sats)
    pub min_output_value: u64,
    /// Value paid to the notification address (sats)
    pub notification_value: u64,
}

impl Default for BuilderDefaults {
    fn default() -> Self {
        Self::from_params(&ProtocolParams::mainnet())
    }
}

impl BuilderDefaults {
    /// Defaults taking dust and notification values from protocol params
    pub fn from_params(params: &ProtocolParams) -> Self {
        Self {
            version: DEFAULT_TX_VERSION,
            locktime: DEFAULT_LOCKTIME,
            fee_rate: DEFAULT_FEE_RATE,
            min_fee_rate: DEFAULT_MIN_FEE_RATE,
            max_fee_rate: DEFAULT_MAX_FEE_RATE,
            min_output_value: params.min_output_value,
            notification_value: params.notification_value,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BnsConfig {
    /// Selected network
    pub network: NetworkType,
    /// Resolution rules
    pub resolver: ResolverConfig,
    /// Transaction defaults
    pub builder: BuilderDefaults,
    /// Backup-phrase validation
    pub backup_policy: BackupPolicy,
    /// Chain API base path per network
    pub api_paths: BTreeMap<NetworkType, String>,
}

impl Default for BnsConfig {
    fn default() -> Self {
        let api_paths = NetworkType::ALL
            .iter()
            .map(|n| (*n, Network::from_type(*n).default_api_path.to_string()))
            .collect();
        Self {
            network: NetworkType::Mainnet,
            resolver: ResolverConfig::default(),
            builder: BuilderDefaults::default(),
            backup_policy: BackupPolicy::default(),
            api_paths,
        }
    }
}

impl BnsConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&contents)?;
        tracing::debug!(
            "Loaded configuration from {} (network {})",
            path.as_ref().display(),
            config.network
        );
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Chain API path for the selected network
    pub fn api_path(&self) -> &str {
        self.api_paths
            .get(&self.network)
            .map(String::as_str)
            .unwrap_or_else(|| Network::from_type(self.network).default_api_path)
    }
}
