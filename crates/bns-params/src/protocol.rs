//! Protocol constants for the name system

use crate::network::{Network, NetworkType};

/// Maximum embedded payload size in bytes per transaction (OP_RETURN relay limit)
pub const BYTES_MAX: usize = 80;

/// Marker character that turns a payload token into a command
pub const COMMAND_MARKER: char = '!';

/// Reserved network key for fixed-length binary buffer entries
pub const BUFFER_NETWORK_KEY: &str = "?";

/// Length of a buffer entry's raw address (compressed stealth scan key)
pub const BUFFER_ENTRY_LEN: usize = 33;

/// Separator byte between payload tokens
pub const TOKEN_SEPARATOR: u8 = b' ';

/// Extension appended to aliases entered without one
pub const DEFAULT_EXTENSION: &str = ".btc";

/// Default transaction version
pub const DEFAULT_TX_VERSION: i32 = 2;

/// Default transaction locktime
pub const DEFAULT_LOCKTIME: u32 = 0;

/// Default fee rate (sat/vB)
pub const DEFAULT_FEE_RATE: f64 = 1.0;

/// Default lower fee-rate bound (sat/vB)
pub const DEFAULT_MIN_FEE_RATE: f64 = 1.0;

/// Default upper fee-rate bound (sat/vB)
pub const DEFAULT_MAX_FEE_RATE: f64 = 1000.0;

/// Default minimum economical output value (sats)
pub const DEFAULT_MIN_OUTPUT_VALUE: u64 = 500;

/// Protocol parameters bound to a network
#[derive(Debug, Clone)]
pub struct ProtocolParams {
    /// Network configuration
    pub network: Network,
    /// Maximum embedded payload bytes
    pub bytes_max: usize,
    /// Default dust limit (sats)
    pub min_output_value: u64,
    /// Default value paid to a notification address (sats)
    pub notification_value: u64,
}

impl ProtocolParams {
    /// Create protocol params for mainnet
    pub fn mainnet() -> Self {
        Self::from_network(NetworkType::Mainnet)
    }

    /// Create protocol params for testnet
    pub fn testnet() -> Self {
        Self::from_network(NetworkType::Testnet)
    }

    /// Get protocol params by network type
    pub fn from_network(network_type: NetworkType) -> Self {
        Self {
            network: Network::from_type(network_type),
            bytes_max: BYTES_MAX,
            min_output_value: DEFAULT_MIN_OUTPUT_VALUE,
            notification_value: DEFAULT_MIN_OUTPUT_VALUE,
        }
    }

    /// Check if a payload of the given size fits in one transaction
    pub fn fits_payload(&self, bytes: usize) -> bool {
        bytes <= self.bytes_max
    }

    /// Check if an output value is economical
    pub fn is_economical(&self, value: u64) -> bool {
        value >= self.min_output_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_boundary() {
        let params = ProtocolParams::mainnet();
        assert!(params.fits_payload(BYTES_MAX));
        assert!(!params.fits_payload(BYTES_MAX + 1));
    }

    #[test]
    fn test_dust_boundary() {
        let params = ProtocolParams::testnet();
        assert!(params.is_economical(DEFAULT_MIN_OUTPUT_VALUE));
        assert!(!params.is_economical(DEFAULT_MIN_OUTPUT_VALUE - 1));
        assert_eq!(params.network.network_type, NetworkType::Testnet);
    }

    #[test]
    fn test_buffer_entry_fits_budget() {
        assert!(BUFFER_NETWORK_KEY.len() + 1 + BUFFER_ENTRY_LEN <= BYTES_MAX);
    }
}
