//! Chain-data provider boundary

use async_trait::async_trait;
use bns_core::TransactionRecord;
use bns_params::NetworkType;
use std::sync::Arc;
use std::time::Duration;

/// Chain-data provider failure
///
/// Retrying is left to the caller; nothing here retries internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Backend could not be reached
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Request did not complete in time
    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    /// Backend answered with something unusable
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Backend does not serve this network
    #[error("Network {0} not served by this provider")]
    UnsupportedNetwork(NetworkType),
}

impl ProviderError {
    /// Check whether the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::Timeout(_))
    }
}

/// Source of chain height and address histories
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Current chain height
    async fn get_height(&self, network: NetworkType) -> Result<u64, ProviderError>;

    /// Every transaction touching an address, mined and mempool
    async fn get_address_history(
        &self,
        address: &str,
        network: NetworkType,
    ) -> Result<Vec<TransactionRecord>, ProviderError>;
}

#[async_trait]
impl<T: ChainDataProvider + ?Sized> ChainDataProvider for Arc<T> {
    async fn get_height(&self, network: NetworkType) -> Result<u64, ProviderError> {
        (**self).get_height(network).await
    }

    async fn get_address_history(
        &self,
        address: &str,
        network: NetworkType,
    ) -> Result<Vec<TransactionRecord>, ProviderError> {
        (**self).get_address_history(address, network).await
    }
}
