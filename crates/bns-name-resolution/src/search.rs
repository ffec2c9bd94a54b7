//! Domain search
//!
//! Height is fetched before history so the snapshot is never resolved
//! against a height older than the records it orders. Any provider failure
//! fails the whole search; no stale state is synthesized.

use crate::provider::{ChainDataProvider, ProviderError};
use crate::{Error, Result};
use bns_core::{Alias, BnsConfig, DomainResolver, DomainState, ResolverConfig};
use bns_params::NetworkType;
use std::future::Future;
use std::time::Duration;

/// Resolves aliases against a chain-data provider
#[derive(Debug, Clone)]
pub struct DomainSearch<P> {
    provider: P,
    network: NetworkType,
    config: ResolverConfig,
    request_timeout: Option<Duration>,
}

impl<P: ChainDataProvider> DomainSearch<P> {
    /// Create search
    pub fn new(provider: P, network: NetworkType, config: ResolverConfig) -> Self {
        Self {
            provider,
            network,
            config,
            request_timeout: None,
        }
    }

    /// Create search from the application configuration
    pub fn from_config(provider: P, config: &BnsConfig) -> Self {
        Self::new(provider, config.network, config.resolver)
    }

    /// Fail each provider request that takes longer than `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Network searched
    pub fn network(&self) -> NetworkType {
        self.network
    }

    /// Underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Parse and resolve a full name such as `satoshi.btc`
    pub async fn search(&self, full_name: &str) -> Result<DomainState> {
        let alias = Alias::parse(full_name)?;
        self.search_alias(alias).await
    }

    /// Resolve an alias at the current chain height
    pub async fn search_alias(&self, alias: Alias) -> Result<DomainState> {
        let resolver = DomainResolver::new(alias, self.network, self.config)?;
        let notification_address = resolver.notification_address().to_string();
        tracing::debug!("Searching {} via {}", resolver.alias(), notification_address);

        let provider_error = |source: ProviderError| {
            tracing::warn!("Search for {} failed: {}", notification_address, source);
            Error::Provider {
                notification_address: notification_address.clone(),
                source,
            }
        };

        let height = self
            .request(self.provider.get_height(self.network))
            .await
            .map_err(provider_error)?;
        let history = self
            .request(
                self.provider
                    .get_address_history(&notification_address, self.network),
            )
            .await
            .map_err(provider_error)?;

        tracing::info!(
            "Fetched {} record(s) for {} at height {}",
            history.len(),
            resolver.alias(),
            height
        );

        resolver
            .resolve(&history, height)
            .map_err(|source| Error::Resolution {
                notification_address: notification_address.clone(),
                source,
            })
    }

    async fn request<T, F>(&self, fut: F) -> std::result::Result<T, ProviderError>
    where
        F: Future<Output = std::result::Result<T, ProviderError>>,
    {
        match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| ProviderError::Timeout(timeout))?,
            None => fut.await,
        }
    }
}
