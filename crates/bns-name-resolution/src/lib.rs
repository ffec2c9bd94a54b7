//! Domain search over a chain-data provider
//!
//! Fetches the current height and the notification-address history of an
//! alias, then hands both to the core resolver.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod memory;
pub mod provider;
pub mod search;

pub use memory::{ChainFixture, MemoryProvider};
pub use provider::{ChainDataProvider, ProviderError};
pub use search::DomainSearch;

use bns_core::ResolutionError;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Chain data could not be fetched
    #[error("Chain data unavailable for {notification_address}: {source}")]
    Provider {
        /// Address that was being scanned
        notification_address: String,
        /// Provider failure
        #[source]
        source: ProviderError,
    },

    /// History was fetched but holds no usable claim
    #[error("{source}")]
    Resolution {
        /// Address that was scanned
        notification_address: String,
        /// Resolution outcome
        #[source]
        source: ResolutionError,
    },

    /// Core error (invalid alias, unsupported network)
    #[error(transparent)]
    Core(#[from] bns_core::Error),
}

impl Error {
    /// Notification address of the failed search, when one was derived
    pub fn notification_address(&self) -> Option<&str> {
        match self {
            Error::Provider {
                notification_address,
                ..
            }
            | Error::Resolution {
                notification_address,
                ..
            } => Some(notification_address),
            Error::Core(_) => None,
        }
    }

    /// Check whether retrying the same search may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Provider { source, .. } => source.is_retryable(),
            Error::Resolution {
                source: ResolutionError::IncompleteHistory { .. },
                ..
            } => true,
            _ => false,
        }
    }

    /// Check whether the domain is simply unregistered
    pub fn is_unregistered(&self) -> bool {
        matches!(
            self,
            Error::Resolution {
                source: ResolutionError::NoHistory { .. },
                ..
            }
        )
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_address() {
        let error = Error::Provider {
            notification_address: "bc1qnotify".to_string(),
            source: ProviderError::Unavailable("connection refused".to_string()),
        };
        assert_eq!(error.notification_address(), Some("bc1qnotify"));
        assert!(error.is_retryable());
        assert!(error.to_string().contains("bc1qnotify"));
    }

    #[test]
    fn test_resolution_classification() {
        let unregistered = Error::Resolution {
            notification_address: "bc1qnotify".to_string(),
            source: ResolutionError::NoHistory {
                alias: "a.btc".to_string(),
                notification_address: "bc1qnotify".to_string(),
            },
        };
        assert!(unregistered.is_unregistered());
        assert!(!unregistered.is_retryable());

        let core = Error::from(bns_core::Error::InvalidAlias("x".to_string()));
        assert_eq!(core.notification_address(), None);
    }
}
