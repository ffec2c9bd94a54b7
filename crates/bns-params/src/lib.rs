//! BNS network parameters and protocol constants
//!
//! This crate provides the network definitions the name system is anchored
//! on and the fixed protocol limits shared by the resolver and the
//! transaction builder.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod network;
pub mod protocol;

pub use network::{Network, NetworkType};
pub use protocol::{
    ProtocolParams, BUFFER_ENTRY_LEN, BUFFER_NETWORK_KEY, BYTES_MAX, COMMAND_MARKER,
    DEFAULT_EXTENSION, DEFAULT_FEE_RATE, DEFAULT_LOCKTIME, DEFAULT_MAX_FEE_RATE,
    DEFAULT_MIN_FEE_RATE, DEFAULT_MIN_OUTPUT_VALUE, DEFAULT_TX_VERSION, TOKEN_SEPARATOR,
};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
