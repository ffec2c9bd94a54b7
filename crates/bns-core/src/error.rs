//! Error types for BNS Core
//!
//! Resolution outcomes, builder validation failures and the umbrella error
//! used by the remaining wallet operations.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Domain resolution outcomes that are not snapshots
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// Alias was never (validly) notified; the domain is unregistered
    #[error("No history: {alias} has no valid claim at {notification_address}")]
    NoHistory {
        /// Full alias name
        alias: String,
        /// Notification address that was scanned
        notification_address: String,
    },

    /// Only provisional records exist, so ownership cannot be ordered by height
    #[error("Incomplete history: {pending} provisional record(s) for {alias} await confirmation")]
    IncompleteHistory {
        /// Full alias name
        alias: String,
        /// Number of provisional records blocking the resolution
        pending: usize,
    },
}

/// Output rule violated when checking dust
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DustViolation {
    /// A required output pays less than the minimum output value
    RequiredOutput {
        /// Output key in the descriptor
        key: u32,
        /// Requested value
        value: u64,
        /// Minimum output value
        min_output_value: u64,
    },
    /// Economical change exists but there is no address to send it to
    ChangeWithoutAddress {
        /// Change that could not be placed
        change: u64,
    },
}

impl fmt::Display for DustViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DustViolation::RequiredOutput {
                key,
                value,
                min_output_value,
            } => write!(
                f,
                "output {} pays {} sats, minimum is {} sats",
                key, value, min_output_value
            ),
            DustViolation::ChangeWithoutAddress { change } => {
                write!(f, "change of {} sats has no change address", change)
            }
        }
    }
}

/// Transaction builder validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuilderError {
    /// Inputs cannot cover outputs plus fee
    #[error("Insufficient funds: required {required} sats, available {available} sats")]
    InsufficientFunds {
        /// Outputs plus fee
        required: u64,
        /// Value of every usable input
        available: u64,
    },

    /// Requested or effective fee rate falls outside the configured bounds
    #[error("Fee rate {rate} sat/vB outside bounds [{min}, {max}]")]
    FeeOutOfBounds {
        /// Offending fee rate (sat/vB)
        rate: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// An output would be uneconomical or unplaceable
    #[error("Output below dust limit: {0}")]
    OutputBelowDustLimit(DustViolation),

    /// Aggregate embedded data exceeds capacity
    #[error("Payload too large: {cost} bytes, maximum is {max} bytes")]
    PayloadTooLarge {
        /// Measured payload bytes
        cost: usize,
        /// Capacity
        max: usize,
    },

    /// Nothing to spend
    #[error("No spendable inputs")]
    NoSpendableInputs,

    /// Descriptor contradicts itself
    #[error("Inconsistent descriptor: {0}")]
    InconsistentDescriptor(String),

    /// Output or change address cannot be decoded for the network
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// BNS Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Domain resolution outcome
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Transaction builder failure
    #[error(transparent)]
    Builder(#[from] BuilderError),

    /// Invalid alias
    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    /// Embedded payload cannot be decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Planned payload exceeds the byte budget
    #[error("Payload too large: {cost} bytes, maximum is {max} bytes")]
    PayloadTooLarge {
        /// Measured payload bytes
        cost: usize,
        /// Capacity
        max: usize,
    },

    /// Command entries are derived from the chosen action
    #[error("Command cannot be removed: {0}")]
    CommandNotRemovable(String),

    /// Invalid forwarding entry
    #[error("Invalid forward: {0}")]
    InvalidForward(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid backup phrase
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Key derivation error
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Builder(_)
                | Error::InvalidAlias(_)
                | Error::PayloadTooLarge { .. }
                | Error::CommandNotRemovable(_)
                | Error::InvalidForward(_)
                | Error::InvalidAddress(_)
                | Error::InvalidMnemonic(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Builder(BuilderError::InsufficientFunds {
                required,
                available,
            }) => format!(
                "You don't have enough funds for this transaction. It needs {} sats but only {} sats are available.",
                required, available
            ),
            Error::Builder(BuilderError::PayloadTooLarge { cost, max })
            | Error::PayloadTooLarge { cost, max } => format!(
                "Too much by {} Bytes. Remove some planned changes and try again.",
                cost.saturating_sub(*max)
            ),
            Error::Builder(BuilderError::FeeOutOfBounds { rate, min, max }) => format!(
                "The fee rate of {} sat/vB must stay between {} and {} sat/vB.",
                rate, min, max
            ),
            Error::Resolution(ResolutionError::NoHistory { alias, .. }) => {
                format!("{} is not registered yet.", alias)
            }
            Error::Resolution(ResolutionError::IncompleteHistory { alias, .. }) => format!(
                "{} has unconfirmed activity. Please try again after the next block.",
                alias
            ),
            Error::InvalidAlias(_) => {
                "The domain name is invalid. Please check and try again.".to_string()
            }
            Error::InvalidMnemonic(_) => {
                "The backup phrase is invalid. Please check and try again.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Resolution(_) => ErrorCategory::Resolution,
            Error::Builder(BuilderError::InsufficientFunds { .. })
            | Error::Builder(BuilderError::NoSpendableInputs) => ErrorCategory::Funds,
            Error::Builder(BuilderError::FeeOutOfBounds { .. }) => ErrorCategory::Fee,
            Error::Builder(BuilderError::PayloadTooLarge { .. })
            | Error::PayloadTooLarge { .. }
            | Error::MalformedPayload(_)
            | Error::CommandNotRemovable(_)
            | Error::InvalidForward(_) => ErrorCategory::Payload,
            Error::Builder(BuilderError::InvalidAddress(_)) | Error::InvalidAddress(_) => {
                ErrorCategory::Address
            }
            Error::Builder(_) => ErrorCategory::Transaction,
            Error::InvalidAlias(_) => ErrorCategory::Alias,
            Error::InvalidMnemonic(_) | Error::KeyDerivation(_) => ErrorCategory::Wallet,
            Error::Io(_) | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Alias-related errors
    Alias,
    /// Address-related errors
    Address,
    /// Embedded payload errors
    Payload,
    /// Domain resolution outcomes
    Resolution,
    /// Fee-related errors
    Fee,
    /// Funds and input errors
    Funds,
    /// Transaction-related errors
    Transaction,
    /// Wallet / backup errors
    Wallet,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Alias => write!(f, "Alias"),
            ErrorCategory::Address => write!(f, "Address"),
            ErrorCategory::Payload => write!(f, "Payload"),
            ErrorCategory::Resolution => write!(f, "Resolution"),
            ErrorCategory::Fee => write!(f, "Fee"),
            ErrorCategory::Funds => write!(f, "Funds"),
            ErrorCategory::Transaction => write!(f, "Transaction"),
            ErrorCategory::Wallet => write!(f, "Wallet"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}
