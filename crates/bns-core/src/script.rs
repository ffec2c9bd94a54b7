//! Output scripts and address decoding
//!
//! Covers only what the name system needs: turning addresses into output
//! scripts, embedding data in provably unspendable outputs and reading it
//! back out of chain history.

use crate::{Error, Result};
use bech32::{segwit, Fe32, Hrp};
use bns_params::{Network, NetworkType};
use sha2::{Digest, Sha256};

/// Push the next byte as data length
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Push the next two bytes as data length
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Marks an output as provably unspendable
pub const OP_RETURN: u8 = 0x6a;
/// Drop top stack item
pub const OP_DROP: u8 = 0x75;
/// Push 1 (OP_TRUE)
pub const OP_1: u8 = 0x51;
/// Duplicate top stack item
pub const OP_DUP: u8 = 0x76;
/// Hash160 of top stack item
pub const OP_HASH160: u8 = 0xa9;
/// Equality check
pub const OP_EQUAL: u8 = 0x87;
/// Equality check, fail otherwise
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Signature check
pub const OP_CHECKSIG: u8 = 0xac;

/// Standard address types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Pay to public key hash
    P2pkh,
    /// Pay to script hash
    P2sh,
    /// Segwit v0 key hash
    P2wpkh,
    /// Segwit v0 script hash
    P2wsh,
    /// Segwit v1 taproot
    P2tr,
    /// Future witness version
    WitnessUnknown(u8),
}

/// Address decoded against a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    /// Address type
    pub kind: AddressKind,
    /// Output script paying this address
    pub script_pubkey: Vec<u8>,
}

/// Append a minimal data push to a script
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= u8::MAX as usize {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Build a provably unspendable output script carrying `data`
pub fn embed_data(data: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(data.len() + 3);
    script.push(OP_RETURN);
    if !data.is_empty() {
        push_data(&mut script, data);
    }
    script
}

/// Extract the data carried by an OP_RETURN script
///
/// Returns `None` for anything that is not a data carrier. Multiple pushes
/// are concatenated in order.
pub fn extract_embedded_data(script: &[u8]) -> Option<Vec<u8>> {
    let (&first, mut rest) = script.split_first()?;
    if first != OP_RETURN {
        return None;
    }

    let mut data = Vec::new();
    while let Some((&op, tail)) = rest.split_first() {
        let (len, tail) = match op {
            0x01..=0x4b => (op as usize, tail),
            OP_PUSHDATA1 => {
                let (&len, tail) = tail.split_first()?;
                (len as usize, tail)
            }
            OP_PUSHDATA2 => {
                if tail.len() < 2 {
                    return None;
                }
                (u16::from_le_bytes([tail[0], tail[1]]) as usize, &tail[2..])
            }
            _ => return None,
        };
        if tail.len() < len {
            return None;
        }
        data.extend_from_slice(&tail[..len]);
        rest = &tail[len..];
    }
    Some(data)
}

/// Encode a segwit v0 script-hash address for a witness script
pub fn p2wsh_address(witness_script: &[u8], network: NetworkType) -> Result<String> {
    let program: [u8; 32] = Sha256::digest(witness_script).into();
    encode_segwit(network, segwit::VERSION_0, &program)
}

fn encode_segwit(network: NetworkType, version: Fe32, program: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(Network::from_type(network).bech32_hrp)
        .map_err(|e| Error::InvalidAddress(format!("Invalid bech32 prefix: {}", e)))?;
    segwit::encode(hrp, version, program)
        .map_err(|e| Error::InvalidAddress(format!("Failed to encode address: {}", e)))
}

/// Decode an address and derive the script paying it
pub fn decode_address(address: &str, network: NetworkType) -> Result<DecodedAddress> {
    let params = Network::from_type(network);

    if let Ok((hrp, version, program)) = segwit::decode(address) {
        if !hrp.as_str().eq_ignore_ascii_case(params.bech32_hrp) {
            let owner = Network::from_bech32_hrp(hrp.as_str())
                .map_or("an unknown network", |n| n.name);
            return Err(Error::InvalidAddress(format!(
                "{} belongs to {}, not {}",
                address, owner, params.name
            )));
        }
        let version = version.to_u8();
        let kind = match (version, program.len()) {
            (0, 20) => AddressKind::P2wpkh,
            (0, 32) => AddressKind::P2wsh,
            (1, 32) => AddressKind::P2tr,
            (v, _) => AddressKind::WitnessUnknown(v),
        };
        let mut script_pubkey = Vec::with_capacity(program.len() + 2);
        script_pubkey.push(if version == 0 { 0x00 } else { 0x50 + version });
        push_data(&mut script_pubkey, &program);
        return Ok(DecodedAddress {
            kind,
            script_pubkey,
        });
    }

    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))?;
    if payload.len() != 21 {
        return Err(Error::InvalidAddress(format!(
            "{}: expected 21 payload bytes, got {}",
            address,
            payload.len()
        )));
    }

    let (prefix, hash) = (payload[0], &payload[1..]);
    if !params.owns_base58_prefix(prefix) {
        return Err(Error::InvalidAddress(format!(
            "{} has version byte {:#04x}, not valid on {}",
            address, prefix, params.name
        )));
    }
    let mut script_pubkey = Vec::with_capacity(25);
    let kind = if prefix == params.p2pkh_prefix {
        script_pubkey.extend_from_slice(&[OP_DUP, OP_HASH160]);
        push_data(&mut script_pubkey, hash);
        script_pubkey.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        AddressKind::P2pkh
    } else {
        script_pubkey.push(OP_HASH160);
        push_data(&mut script_pubkey, hash);
        script_pubkey.push(OP_EQUAL);
        AddressKind::P2sh
    };

    Ok(DecodedAddress {
        kind,
        script_pubkey,
    })
}

/// Canonical text form of a valid address
///
/// Bech32 accepts all-uppercase input; the canonical form is lowercase.
/// Base58 is case sensitive and returned unchanged.
pub fn canonical_address(address: &str, network: NetworkType) -> Result<String> {
    decode_address(address, network)?;
    if segwit::decode(address).is_ok() {
        Ok(address.to_ascii_lowercase())
    } else {
        Ok(address.to_string())
    }
}

/// Check whether two addresses pay the same output script
///
/// Strings that do not decode on `network` only match themselves.
pub fn same_address(a: &str, b: &str, network: NetworkType) -> bool {
    if a == b {
        return true;
    }
    match (decode_address(a, network), decode_address(b, network)) {
        (Ok(a), Ok(b)) => a.script_pubkey == b.script_pubkey,
        _ => false,
    }
}
