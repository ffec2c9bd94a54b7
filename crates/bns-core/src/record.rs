//! Chain history records as supplied by a chain-data provider

use crate::script::extract_embedded_data;
use serde::{Deserialize, Serialize};

/// Confirmation status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TxStatus {
    /// Mined at a height, at a position within the block
    Confirmed {
        /// Block height
        block_height: u64,
        /// Transaction index within the block
        block_index: u32,
    },
    /// In the mempool; may be replaced or dropped
    Unconfirmed,
}

/// Spent output feeding a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    /// Address the spent output paid, if standard
    pub address: Option<String>,
    /// Value of the spent output (sats)
    pub value: u64,
}

/// Output of a history transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutput {
    /// Address paid, if standard
    pub address: Option<String>,
    /// Output value (sats)
    pub value: u64,
    /// Raw output script
    #[serde(with = "crate::serde_hex", default)]
    pub script_pubkey: Vec<u8>,
}

impl RecordOutput {
    /// Payment output
    pub fn payment(address: &str, value: u64) -> Self {
        Self {
            address: Some(address.to_string()),
            value,
            script_pubkey: Vec::new(),
        }
    }

    /// Provably unspendable data output
    pub fn data(payload: &[u8]) -> Self {
        Self {
            address: None,
            value: 0,
            script_pubkey: crate::script::embed_data(payload),
        }
    }

    /// Embedded data, if this is a data carrier
    pub fn embedded_data(&self) -> Option<Vec<u8>> {
        if self.address.is_some() {
            return None;
        }
        extract_embedded_data(&self.script_pubkey)
    }
}

/// Transaction from an address history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction id (hex)
    pub txid: String,
    /// Confirmation status
    pub status: TxStatus,
    /// Inputs in order
    pub inputs: Vec<RecordInput>,
    /// Outputs in order
    pub outputs: Vec<RecordOutput>,
}

impl TransactionRecord {
    /// Total paid to an address
    pub fn paid_to(&self, address: &str) -> u64 {
        self.outputs
            .iter()
            .filter(|o| o.address.as_deref() == Some(address))
            .map(|o| o.value)
            .sum()
    }

    /// Address of the first input with a known address
    pub fn funding_address(&self) -> Option<&str> {
        self.inputs.iter().find_map(|i| i.address.as_deref())
    }

    /// Data carried by the first data output
    pub fn embedded_payload(&self) -> Option<Vec<u8>> {
        self.outputs.iter().find_map(RecordOutput::embedded_data)
    }

    /// Confirmed (height, block index)
    pub fn position(&self) -> Option<(u64, u32)> {
        match self.status {
            TxStatus::Confirmed {
                block_height,
                block_index,
            } => Some((block_height, block_index)),
            TxStatus::Unconfirmed => None,
        }
    }

    /// Check if mined
    pub fn is_confirmed(&self) -> bool {
        self.position().is_some()
    }
}

// Test helpers
#[cfg(any(test, feature = "test-helpers"))]
impl TransactionRecord {
    /// Record paying `value` to `to`, funded by `funder` (for testing only)
    pub fn test_payment(txid: &str, status: TxStatus, funder: &str, to: &str, value: u64) -> Self {
        Self {
            txid: txid.to_string(),
            status,
            inputs: vec![RecordInput {
                address: Some(funder.to_string()),
                value: value.saturating_add(100_000),
            }],
            outputs: vec![RecordOutput::payment(to, value)],
        }
    }

    /// Append a data output (for testing only)
    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        self.outputs.push(RecordOutput::data(payload));
        self
    }
}
