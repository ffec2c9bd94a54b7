//! Fee-rate bounds and transaction size estimation
//!
//! Sizes follow segwit weighting: non-witness bytes count four times,
//! witness bytes once, and the virtual size is the weight divided by four
//! rounded up. Fees are computed in millisatoshis so that the same rate and
//! size always give the same fee.

use crate::error::BuilderError;
use crate::script::AddressKind;
use bns_params::{DEFAULT_FEE_RATE, DEFAULT_MAX_FEE_RATE, DEFAULT_MIN_FEE_RATE};
use serde::{Deserialize, Serialize};

/// Version + locktime
const TX_FIXED_BYTES: usize = 8;
/// Segwit marker + flag
const SEGWIT_HEADER_BYTES: usize = 2;
/// Outpoint + script length + sequence, without scriptSig
const TXIN_BASE_BYTES: usize = 32 + 4 + 1 + 4;
/// DER signature with sighash byte, push included
const SIGNATURE_BYTES: usize = 73;
/// Compressed public key, push included
const PUBKEY_BYTES: usize = 34;

/// Spend condition of an input, as needed for sizing and signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputScriptType {
    /// Legacy pay-to-pubkey-hash
    P2pkh,
    /// Wrapped segwit pay-to-witness-pubkey-hash
    P2shP2wpkh,
    /// Native segwit pay-to-witness-pubkey-hash
    P2wpkh,
    /// Taproot key-path spend
    P2tr,
    /// Native segwit script-hash spend
    P2wsh {
        /// Witness script revealed when spending
        #[serde(with = "crate::serde_hex")]
        witness_script: Vec<u8>,
        /// Signatures the script requires
        signatures: u32,
    },
}

impl InputScriptType {
    /// Script type for a single-key address kind
    pub fn from_address_kind(kind: AddressKind) -> Option<Self> {
        match kind {
            AddressKind::P2pkh => Some(InputScriptType::P2pkh),
            AddressKind::P2sh => Some(InputScriptType::P2shP2wpkh),
            AddressKind::P2wpkh => Some(InputScriptType::P2wpkh),
            AddressKind::P2tr => Some(InputScriptType::P2tr),
            AddressKind::P2wsh | AddressKind::WitnessUnknown(_) => None,
        }
    }

    /// Signatures needed to spend
    pub fn required_signatures(&self) -> u32 {
        match self {
            InputScriptType::P2wsh { signatures, .. } => *signatures,
            _ => 1,
        }
    }

    /// Check if the spend carries witness data
    pub fn is_segwit(&self) -> bool {
        !matches!(self, InputScriptType::P2pkh)
    }

    /// Input bytes outside the witness
    pub fn non_witness_size(&self) -> usize {
        match self {
            // scriptSig: push sig + push pubkey
            InputScriptType::P2pkh => TXIN_BASE_BYTES + SIGNATURE_BYTES + PUBKEY_BYTES,
            // scriptSig: push of the 22-byte redeem script
            InputScriptType::P2shP2wpkh => TXIN_BASE_BYTES + 23,
            _ => TXIN_BASE_BYTES,
        }
    }

    /// Witness bytes, item count included
    pub fn witness_size(&self) -> usize {
        match self {
            InputScriptType::P2pkh => 0,
            InputScriptType::P2shP2wpkh | InputScriptType::P2wpkh => {
                1 + SIGNATURE_BYTES + PUBKEY_BYTES
            }
            InputScriptType::P2tr => 1 + 1 + 64,
            InputScriptType::P2wsh {
                witness_script,
                signatures,
            } => {
                1 + *signatures as usize * SIGNATURE_BYTES
                    + varint_len(witness_script.len() as u64)
                    + witness_script.len()
            }
        }
    }
}

/// Serialized length of a compact-size integer
pub fn varint_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Serialized output length for a script
pub fn output_size(script_len: usize) -> usize {
    8 + varint_len(script_len as u64) + script_len
}

/// Estimated transaction size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEstimate {
    /// Weight units
    pub weight: u64,
    /// Virtual bytes
    pub vsize: u64,
}

/// Estimate size from input script types and output script lengths
pub fn estimate_size(inputs: &[&InputScriptType], output_script_lens: &[usize]) -> SizeEstimate {
    let non_witness = TX_FIXED_BYTES
        + varint_len(inputs.len() as u64)
        + inputs.iter().map(|i| i.non_witness_size()).sum::<usize>()
        + varint_len(output_script_lens.len() as u64)
        + output_script_lens.iter().map(|l| output_size(*l)).sum::<usize>();

    let witness = if inputs.iter().any(|i| i.is_segwit()) {
        // Legacy inputs still need an empty witness stack
        SEGWIT_HEADER_BYTES
            + inputs
                .iter()
                .map(|i| if i.is_segwit() { i.witness_size() } else { 1 })
                .sum::<usize>()
    } else {
        0
    };

    let weight = (non_witness * 4 + witness) as u64;
    SizeEstimate {
        weight,
        vsize: weight.div_ceil(4),
    }
}

/// Allowed fee-rate range (sat/vB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRateBounds {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl FeeRateBounds {
    /// Create bounds
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check a rate against the bounds
    pub fn check(&self, rate: f64) -> Result<(), BuilderError> {
        let well_formed = self.min.is_finite() && self.max.is_finite() && self.min <= self.max;
        if !well_formed || !rate.is_finite() || rate < self.min || rate > self.max {
            return Err(BuilderError::FeeOutOfBounds {
                rate,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for FeeRateBounds {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FEE_RATE, DEFAULT_MAX_FEE_RATE)
    }
}

/// Fee calculator for a validated rate
#[derive(Debug, Clone, Copy)]
pub struct FeeCalculator {
    fee_rate: f64,
    bounds: FeeRateBounds,
}

impl FeeCalculator {
    /// Create calculator; the rate must lie within the bounds
    pub fn new(fee_rate: f64, bounds: FeeRateBounds) -> Result<Self, BuilderError> {
        bounds.check(fee_rate)?;
        Ok(Self { fee_rate, bounds })
    }

    /// Requested rate (sat/vB)
    pub fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    /// Bounds the calculator enforces
    pub fn bounds(&self) -> FeeRateBounds {
        self.bounds
    }

    /// Fee for a virtual size, rounded up to whole sats
    pub fn fee_for_vsize(&self, vsize: u64) -> u64 {
        let msat_per_vbyte = (self.fee_rate * 1000.0).round() as u64;
        let fee = msat_per_vbyte.saturating_mul(vsize).saturating_add(999) / 1000;
        tracing::debug!("Fee for {} vB at {} sat/vB: {} sats", vsize, self.fee_rate, fee);
        fee
    }

    /// Fee for an estimate
    pub fn fee_for(&self, size: &SizeEstimate) -> u64 {
        self.fee_for_vsize(size.vsize)
    }

    /// Check the rate actually paid once change is settled
    pub fn check_effective(&self, fee: u64, vsize: u64) -> Result<f64, BuilderError> {
        let rate = effective_rate(fee, vsize);
        if rate > self.bounds.max {
            return Err(BuilderError::FeeOutOfBounds {
                rate,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }
        Ok(rate)
    }
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
            bounds: FeeRateBounds::default(),
        }
    }
}

/// Fee paid per virtual byte
pub fn effective_rate(fee: u64, vsize: u64) -> f64 {
    if vsize == 0 {
        return 0.0;
    }
    fee as f64 / vsize as f64
}
