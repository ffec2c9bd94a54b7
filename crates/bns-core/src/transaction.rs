//! Transaction builder
//!
//! Turns a declarative descriptor (required inputs, ordered fill inputs,
//! keyed outputs, fee bounds, optional change address) into a complete
//! unsigned transaction plus the metadata an external signer needs. A build
//! either returns a consistent result or one specific error; nothing
//! partial is exposed.

use crate::config::BuilderDefaults;
use crate::error::{BuilderError, DustViolation};
use crate::fees::{estimate_size, FeeCalculator, FeeRateBounds, InputScriptType, SizeEstimate};
use crate::payload::ByteAccountant;
use crate::script::{decode_address, embed_data};
use crate::selection::{InputSelector, Spendable};
use bns_params::NetworkType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Sequence enabling locktime without signalling replaceability
pub const DEFAULT_SEQUENCE: u32 = 0xffff_fffe;

fn default_sequence() -> u32 {
    DEFAULT_SEQUENCE
}

/// Output being spent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Funding transaction id (hex, display order)
    pub txid: String,
    /// Output index
    pub vout: u32,
    /// Value (sats)
    pub value: u64,
    /// Address the output pays, used to infer the script type
    #[serde(default)]
    pub address: Option<String>,
    /// Spend condition; inferred from the address when absent
    #[serde(default)]
    pub script_type: Option<InputScriptType>,
    /// Input sequence
    #[serde(default = "default_sequence")]
    pub sequence: u32,
}

impl InputSpec {
    /// Input paying a standard single-key address
    pub fn new(txid: &str, vout: u32, value: u64, address: &str) -> Self {
        Self {
            txid: txid.to_string(),
            vout,
            value,
            address: Some(address.to_string()),
            script_type: None,
            sequence: DEFAULT_SEQUENCE,
        }
    }

    /// Set the spend condition explicitly
    pub fn with_script_type(mut self, script_type: InputScriptType) -> Self {
        self.script_type = Some(script_type);
        self
    }
}

/// Required output: an address payment or embedded data, never both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Recipient address
    #[serde(default)]
    pub address: Option<String>,
    /// Data to embed in a provably unspendable output
    #[serde(default, with = "crate::serde_hex::option")]
    pub data: Option<Vec<u8>>,
    /// Value (sats)
    #[serde(default)]
    pub value: u64,
}

impl OutputSpec {
    /// Payment to an address
    pub fn payment(address: &str, value: u64) -> Self {
        Self {
            address: Some(address.to_string()),
            data: None,
            value,
        }
    }

    /// Embedded data output
    pub fn data(data: Vec<u8>) -> Self {
        Self {
            address: None,
            data: Some(data),
            value: 0,
        }
    }
}

/// Declarative transaction description handed to the builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxBuilderDescriptor {
    /// Network addresses are checked against
    pub network: NetworkType,
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
    /// Inputs that must be spent, in key order
    pub inputs: BTreeMap<u32, InputSpec>,
    /// Candidates drawn in order when required inputs fall short
    pub fill_inputs: Option<Vec<InputSpec>>,
    /// Outputs that must be created, in key order
    pub outputs: BTreeMap<u32, OutputSpec>,
    /// Where change goes
    pub change_address: Option<String>,
}

impl Default for TxBuilderDescriptor {
    fn default() -> Self {
        Self::new(NetworkType::Mainnet, &BuilderDefaults::default())
    }
}

impl TxBuilderDescriptor {
    /// Empty descriptor with configured defaults
    pub fn new(network: NetworkType, defaults: &BuilderDefaults) -> Self {
        Self {
            network,
            version: defaults.version,
            locktime: defaults.locktime,
            fee_rate: defaults.fee_rate,
            min_fee_rate: defaults.min_fee_rate,
            max_fee_rate: defaults.max_fee_rate,
            min_output_value: defaults.min_output_value,
            inputs: BTreeMap::new(),
            fill_inputs: None,
            outputs: BTreeMap::new(),
            change_address: None,
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a required input
    pub fn add_input(&mut self, key: u32, input: InputSpec) -> &mut Self {
        self.inputs.insert(key, input);
        self
    }

    /// Append a fill candidate
    pub fn add_fill_input(&mut self, input: InputSpec) -> &mut Self {
        self.fill_inputs.get_or_insert_with(Vec::new).push(input);
        self
    }

    /// Add a required output
    pub fn add_output(&mut self, key: u32, output: OutputSpec) -> &mut Self {
        self.outputs.insert(key, output);
        self
    }

    /// Set the change address
    pub fn with_change_address(&mut self, address: &str) -> &mut Self {
        self.change_address = Some(address.to_string());
        self
    }

    /// Fee-rate bounds
    pub fn fee_bounds(&self) -> FeeRateBounds {
        FeeRateBounds::new(self.min_fee_rate, self.max_fee_rate)
    }
}

/// Role of a built output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum OutputRole {
    /// Required payment
    Payment {
        /// Descriptor key
        key: u32,
    },
    /// Required embedded data
    Data {
        /// Descriptor key
        key: u32,
    },
    /// Change back to the wallet
    Change,
}

/// Output of the built transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltOutput {
    /// Role
    #[serde(flatten)]
    pub role: OutputRole,
    /// Value (sats)
    pub value: u64,
    /// Output script
    #[serde(with = "crate::serde_hex")]
    pub script_pubkey: Vec<u8>,
    /// Address, for payments and change
    pub address: Option<String>,
}

/// Per-input data for the external signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInput {
    /// Funding transaction id
    pub txid: String,
    /// Output index
    pub vout: u32,
    /// Value being spent (sats)
    pub value: u64,
    /// Spend condition
    pub script_type: InputScriptType,
    /// Signatures needed
    pub required_signatures: u32,
    /// Input sequence
    pub sequence: u32,
    /// Address being spent, if known
    pub address: Option<String>,
}

/// Complete unsigned transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltTransaction {
    /// Inputs in transaction order
    pub inputs: Vec<SignerInput>,
    /// Outputs in transaction order; change last
    pub outputs: Vec<BuiltOutput>,
    /// Fee paid (sats)
    pub fee: u64,
    /// Change created, if any
    pub change: Option<u64>,
    /// Estimated weight and virtual size once signed
    pub size: SizeEstimate,
    /// Fee divided by virtual size
    pub effective_fee_rate: f64,
    /// Legacy serialization with empty scriptSigs
    #[serde(with = "crate::serde_hex")]
    pub unsigned_tx: Vec<u8>,
}

impl BuiltTransaction {
    /// Unsigned transaction as hex
    pub fn unsigned_hex(&self) -> String {
        hex::encode(&self.unsigned_tx)
    }

    /// Sum of input values
    pub fn total_input(&self) -> u64 {
        self.inputs.iter().map(|i| i.value).sum()
    }

    /// Sum of output values
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Change output, if any
    pub fn change_output(&self) -> Option<&BuiltOutput> {
        self.outputs.iter().find(|o| o.role == OutputRole::Change)
    }
}

#[derive(Debug, Clone)]
struct PreparedInput {
    spec: InputSpec,
    txid: [u8; 32],
    script_type: InputScriptType,
}

impl Spendable for PreparedInput {
    fn value(&self) -> u64 {
        self.spec.value
    }
}

/// Transaction builder for one descriptor
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    descriptor: TxBuilderDescriptor,
    accountant: ByteAccountant,
}

impl TransactionBuilder {
    /// Create builder
    pub fn new(descriptor: TxBuilderDescriptor) -> Self {
        Self {
            descriptor,
            accountant: ByteAccountant::default(),
        }
    }

    /// Use a custom embedded-data capacity
    pub fn with_accountant(mut self, accountant: ByteAccountant) -> Self {
        self.accountant = accountant;
        self
    }

    /// Descriptor being built
    pub fn descriptor(&self) -> &TxBuilderDescriptor {
        &self.descriptor
    }

    /// Build the unsigned transaction
    pub fn build(&self) -> Result<BuiltTransaction, BuilderError> {
        let d = &self.descriptor;
        let calculator = FeeCalculator::new(d.fee_rate, d.fee_bounds())?;

        let (required, fill) = self.prepare_inputs()?;
        let outputs = self.prepare_outputs()?;
        if required.is_empty() && fill.is_empty() {
            return Err(BuilderError::NoSpendableInputs);
        }

        let change_script = match &d.change_address {
            Some(address) => Some(
                decode_address(address, d.network)
                    .map_err(|e| BuilderError::InvalidAddress(e.to_string()))?
                    .script_pubkey,
            ),
            None => None,
        };

        let output_total = outputs
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value));
        let script_lens: Vec<usize> = outputs.iter().map(|o| o.script_pubkey.len()).collect();
        let base_value = required
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.spec.value));

        let size_for = |drawn: &[PreparedInput], extra_output: Option<usize>| {
            let types: Vec<&InputScriptType> = required
                .iter()
                .chain(drawn.iter())
                .map(|i| &i.script_type)
                .collect();
            let mut lens = script_lens.clone();
            lens.extend(extra_output);
            estimate_size(&types, &lens)
        };

        let selection = InputSelector::new().select(base_value, &fill, |drawn| {
            output_total.saturating_add(calculator.fee_for(&size_for(drawn, None)))
        })?;

        let total_in = selection.total_value;
        let without_change = size_for(&selection.selected, None);
        let leftover = total_in
            .saturating_sub(output_total)
            .saturating_sub(calculator.fee_for(&without_change));

        let mut outputs = outputs;
        let (fee, change, size) = match change_script {
            Some(script) => {
                let with_change = size_for(&selection.selected, Some(script.len()));
                let change = total_in
                    .checked_sub(output_total)
                    .and_then(|v| v.checked_sub(calculator.fee_for(&with_change)))
                    .filter(|change| *change >= d.min_output_value);
                match change {
                    Some(change) => {
                        outputs.push(BuiltOutput {
                            role: OutputRole::Change,
                            value: change,
                            script_pubkey: script,
                            address: d.change_address.clone(),
                        });
                        (total_in - output_total - change, Some(change), with_change)
                    }
                    None => (total_in - output_total, None, without_change),
                }
            }
            None if leftover >= d.min_output_value => {
                return Err(BuilderError::OutputBelowDustLimit(
                    DustViolation::ChangeWithoutAddress { change: leftover },
                ));
            }
            None => (total_in - output_total, None, without_change),
        };

        let effective_fee_rate = calculator.check_effective(fee, size.vsize)?;

        let inputs: Vec<PreparedInput> = required.into_iter().chain(selection.selected).collect();
        let unsigned_tx = serialize_unsigned(d.version, &inputs, &outputs, d.locktime);

        tracing::info!(
            "Built transaction: {} input(s), {} output(s), fee={} sats, vsize={}, change={:?}",
            inputs.len(),
            outputs.len(),
            fee,
            size.vsize,
            change
        );

        Ok(BuiltTransaction {
            inputs: inputs
                .into_iter()
                .map(|i| SignerInput {
                    required_signatures: i.script_type.required_signatures(),
                    txid: i.spec.txid,
                    vout: i.spec.vout,
                    value: i.spec.value,
                    script_type: i.script_type,
                    sequence: i.spec.sequence,
                    address: i.spec.address,
                })
                .collect(),
            outputs,
            fee,
            change,
            size,
            effective_fee_rate,
            unsigned_tx,
        })
    }

    fn prepare_inputs(&self) -> Result<(Vec<PreparedInput>, Vec<PreparedInput>), BuilderError> {
        let d = &self.descriptor;
        let mut seen = HashSet::new();

        let mut prepare = |spec: &InputSpec| -> Result<PreparedInput, BuilderError> {
            let mut txid: [u8; 32] = hex::decode(&spec.txid)
                .ok()
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| {
                    BuilderError::InconsistentDescriptor(format!("Invalid txid '{}'", spec.txid))
                })?;
            if !seen.insert((txid, spec.vout)) {
                return Err(BuilderError::InconsistentDescriptor(format!(
                    "Input {}:{} referenced twice",
                    spec.txid, spec.vout
                )));
            }
            // Display order to wire order
            txid.reverse();

            let script_type = match (&spec.script_type, &spec.address) {
                (Some(script_type), _) => script_type.clone(),
                (None, Some(address)) => {
                    let decoded = decode_address(address, d.network)
                        .map_err(|e| BuilderError::InvalidAddress(e.to_string()))?;
                    InputScriptType::from_address_kind(decoded.kind).ok_or_else(|| {
                        BuilderError::InconsistentDescriptor(format!(
                            "Script type of {}:{} cannot be inferred from {}",
                            spec.txid, spec.vout, address
                        ))
                    })?
                }
                (None, None) => {
                    return Err(BuilderError::InconsistentDescriptor(format!(
                        "Input {}:{} has neither script type nor address",
                        spec.txid, spec.vout
                    )))
                }
            };

            Ok(PreparedInput {
                spec: spec.clone(),
                txid,
                script_type,
            })
        };

        let required = d
            .inputs
            .values()
            .map(&mut prepare)
            .collect::<Result<Vec<_>, _>>()?;
        let fill = d
            .fill_inputs
            .iter()
            .flatten()
            .map(&mut prepare)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((required, fill))
    }

    fn prepare_outputs(&self) -> Result<Vec<BuiltOutput>, BuilderError> {
        let d = &self.descriptor;
        if d.outputs.is_empty() {
            return Err(BuilderError::InconsistentDescriptor(
                "Descriptor has no outputs".to_string(),
            ));
        }

        let mut outputs = Vec::with_capacity(d.outputs.len() + 1);
        let mut chunks: Vec<&[u8]> = Vec::new();
        for (&key, spec) in &d.outputs {
            let output = match (&spec.address, &spec.data) {
                (Some(_), Some(_)) => {
                    return Err(BuilderError::InconsistentDescriptor(format!(
                        "Output {} has both an address and embedded data",
                        key
                    )))
                }
                (None, None) => {
                    return Err(BuilderError::InconsistentDescriptor(format!(
                        "Output {} has neither an address nor embedded data",
                        key
                    )))
                }
                (Some(address), None) => {
                    let decoded = decode_address(address, d.network)
                        .map_err(|e| BuilderError::InvalidAddress(e.to_string()))?;
                    if spec.value < d.min_output_value {
                        return Err(BuilderError::OutputBelowDustLimit(
                            DustViolation::RequiredOutput {
                                key,
                                value: spec.value,
                                min_output_value: d.min_output_value,
                            },
                        ));
                    }
                    BuiltOutput {
                        role: OutputRole::Payment { key },
                        value: spec.value,
                        script_pubkey: decoded.script_pubkey,
                        address: Some(address.clone()),
                    }
                }
                (None, Some(data)) => {
                    chunks.push(data);
                    BuiltOutput {
                        role: OutputRole::Data { key },
                        value: spec.value,
                        script_pubkey: embed_data(data),
                        address: None,
                    }
                }
            };
            outputs.push(output);
        }

        let cost = self.accountant.raw_cost(&chunks);
        if cost > self.accountant.capacity() {
            return Err(BuilderError::PayloadTooLarge {
                cost,
                max: self.accountant.capacity(),
            });
        }
        Ok(outputs)
    }
}

/// Build a descriptor
pub fn build(descriptor: &TxBuilderDescriptor) -> Result<BuiltTransaction, BuilderError> {
    TransactionBuilder::new(descriptor.clone()).build()
}

fn push_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn serialize_unsigned(
    version: i32,
    inputs: &[PreparedInput],
    outputs: &[BuiltOutput],
    locktime: u32,
) -> Vec<u8> {
    let mut tx = Vec::new();
    tx.extend_from_slice(&version.to_le_bytes());
    push_varint(&mut tx, inputs.len() as u64);
    for input in inputs {
        tx.extend_from_slice(&input.txid);
        tx.extend_from_slice(&input.spec.vout.to_le_bytes());
        push_varint(&mut tx, 0);
        tx.extend_from_slice(&input.spec.sequence.to_le_bytes());
    }
    push_varint(&mut tx, outputs.len() as u64);
    for output in outputs {
        tx.extend_from_slice(&output.value.to_le_bytes());
        push_varint(&mut tx, output.script_pubkey.len() as u64);
        tx.extend_from_slice(&output.script_pubkey);
    }
    tx.extend_from_slice(&locktime.to_le_bytes());
    tx
}
