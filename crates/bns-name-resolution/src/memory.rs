//! In-memory provider backed by JSON fixtures

use crate::provider::{ChainDataProvider, ProviderError};
use async_trait::async_trait;
use bns_core::TransactionRecord;
use bns_params::NetworkType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Chain snapshot for one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFixture {
    /// Network the snapshot belongs to
    #[serde(default)]
    pub network: NetworkType,
    /// Chain height
    pub height: u64,
    /// Address histories
    #[serde(default)]
    pub histories: BTreeMap<String, Vec<TransactionRecord>>,
}

impl ChainFixture {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(json).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    /// Load from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }
}

#[derive(Debug, Default)]
struct ChainState {
    heights: HashMap<NetworkType, u64>,
    histories: HashMap<(NetworkType, String), Vec<TransactionRecord>>,
    failure: Option<ProviderError>,
}

/// Provider serving fixed chain data from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    state: Arc<RwLock<ChainState>>,
}

impl MemoryProvider {
    /// Create empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create provider serving a fixture
    pub fn from_fixture(fixture: ChainFixture) -> Self {
        let state = ChainState {
            heights: HashMap::from([(fixture.network, fixture.height)]),
            histories: fixture
                .histories
                .into_iter()
                .map(|(address, history)| ((fixture.network, address), history))
                .collect(),
            failure: None,
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Load a fixture file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let fixture = ChainFixture::load(path).await?;
        tracing::debug!(
            "Loaded fixture for {} at height {} ({} address(es))",
            fixture.network,
            fixture.height,
            fixture.histories.len()
        );
        Ok(Self::from_fixture(fixture))
    }

    /// Set the chain height of a network
    pub async fn set_height(&self, network: NetworkType, height: u64) {
        self.state.write().await.heights.insert(network, height);
    }

    /// Append a transaction to an address history
    pub async fn push_record(
        &self,
        network: NetworkType,
        address: &str,
        record: TransactionRecord,
    ) {
        self.state
            .write()
            .await
            .histories
            .entry((network, address.to_string()))
            .or_default()
            .push(record);
    }

    /// Make every request fail with `error` until cleared with `None`
    pub async fn set_failure(&self, error: Option<ProviderError>) {
        self.state.write().await.failure = error;
    }
}

#[async_trait]
impl ChainDataProvider for MemoryProvider {
    async fn get_height(&self, network: NetworkType) -> Result<u64, ProviderError> {
        let state = self.state.read().await;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state
            .heights
            .get(&network)
            .copied()
            .ok_or(ProviderError::UnsupportedNetwork(network))
    }

    async fn get_address_history(
        &self,
        address: &str,
        network: NetworkType,
    ) -> Result<Vec<TransactionRecord>, ProviderError> {
        let state = self.state.read().await;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        if !state.heights.contains_key(&network) {
            return Err(ProviderError::UnsupportedNetwork(network));
        }
        Ok(state
            .histories
            .get(&(network, address.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bns_core::TxStatus;

    #[tokio::test]
    async fn test_unknown_address_has_empty_history() {
        let provider = MemoryProvider::new();
        provider.set_height(NetworkType::Regtest, 10).await;
        let history = provider
            .get_address_history("bcrt1qunknown", NetworkType::Regtest)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_unserved_network() {
        let provider = MemoryProvider::new();
        assert_eq!(
            provider.get_height(NetworkType::Testnet).await,
            Err(ProviderError::UnsupportedNetwork(NetworkType::Testnet))
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let provider = MemoryProvider::new();
        provider.set_height(NetworkType::Mainnet, 10).await;
        provider
            .set_failure(Some(ProviderError::Unavailable("down".to_string())))
            .await;
        assert!(provider.get_height(NetworkType::Mainnet).await.is_err());

        provider.set_failure(None).await;
        assert_eq!(provider.get_height(NetworkType::Mainnet).await, Ok(10));
    }

    #[test]
    fn test_fixture_json() {
        let json = r#"{
            "network": "mainnet",
            "height": 120,
            "histories": {
                "bc1qnotify": [{
                    "txid": "aa",
                    "status": { "state": "confirmed", "block_height": 100, "block_index": 2 },
                    "inputs": [{ "address": "bc1qfunder", "value": 5000 }],
                    "outputs": [{ "address": "bc1qnotify", "value": 600 }]
                }]
            }
        }"#;
        let fixture = ChainFixture::from_json(json).unwrap();
        assert_eq!(fixture.height, 120);
        let record = &fixture.histories["bc1qnotify"][0];
        assert_eq!(
            record.status,
            TxStatus::Confirmed {
                block_height: 100,
                block_index: 2
            }
        );
        assert!(record.outputs[0].script_pubkey.is_empty());

        assert!(matches!(
            ChainFixture::from_json("{"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
