//! Backup phrases and stealth scan keys

use crate::payload::BufferEntry;
use crate::{Error, Result};
use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use bns_params::{Network, NetworkType};
use serde::{Deserialize, Serialize};

/// Fewest words a backup phrase may have
pub const MIN_BACKUP_WORDS: usize = 12;

/// How strictly a restored phrase is checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupPolicy {
    /// Word count only
    #[default]
    Lenient,
    /// BIP-39 English word list and checksum
    Strict,
}

/// Validate a phrase, returning it normalized (lowercase, single spaces)
pub fn validate_backup_phrase(phrase: &str, policy: BackupPolicy) -> Result<String> {
    let words: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
    if words.len() < MIN_BACKUP_WORDS {
        return Err(Error::InvalidMnemonic(format!(
            "Backup phrase needs at least {} words, got {}",
            MIN_BACKUP_WORDS,
            words.len()
        )));
    }
    let normalized = words.join(" ");

    if policy == BackupPolicy::Strict {
        Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    }

    tracing::debug!("Backup phrase accepted ({} words, {:?})", words.len(), policy);
    Ok(normalized)
}

/// Generate a fresh phrase (12, 18 or 24 words; 12 by default)
pub fn generate_backup_phrase(word_count: Option<u32>) -> Result<String> {
    let entropy_len = match word_count.unwrap_or(12) {
        12 => 16,
        18 => 24,
        24 => 32,
        other => {
            return Err(Error::InvalidMnemonic(format!(
                "Unsupported word count {}",
                other
            )))
        }
    };

    let mut entropy = vec![0u8; entropy_len];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic =
        Mnemonic::from_entropy(&entropy).map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Derivation path of the silent-payment scan key
pub fn scan_key_path(network: NetworkType) -> String {
    format!("m/352'/{}'/0'/1'/0", Network::from_type(network).coin_type)
}

/// Derive the compressed scan public key as a stealth buffer entry
pub fn stealth_scan_key(phrase: &str, network: NetworkType) -> Result<BufferEntry> {
    let normalized = validate_backup_phrase(phrase, BackupPolicy::Strict)?;
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    let seed = mnemonic.to_seed("");

    let path: DerivationPath = scan_key_path(network)
        .parse()
        .map_err(|e: bip32::Error| Error::KeyDerivation(e.to_string()))?;
    let xprv =
        XPrv::derive_from_path(seed, &path).map_err(|e| Error::KeyDerivation(e.to_string()))?;

    BufferEntry::stealth(xprv.public_key().to_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_lenient_counts_words() {
        let phrase = "one two three four five six seven eight nine ten eleven twelve";
        assert!(validate_backup_phrase(phrase, BackupPolicy::Lenient).is_ok());
        assert!(validate_backup_phrase("one two three", BackupPolicy::Lenient).is_err());
    }

    #[test]
    fn test_strict_checks_checksum() {
        let phrase = "one two three four five six seven eight nine ten eleven twelve";
        assert!(matches!(
            validate_backup_phrase(phrase, BackupPolicy::Strict),
            Err(Error::InvalidMnemonic(_))
        ));
        assert!(validate_backup_phrase(PHRASE, BackupPolicy::Strict).is_ok());
    }

    #[test]
    fn test_normalizes_whitespace_and_case() {
        let messy = format!("  {}  ", PHRASE.to_uppercase().replace(' ', "\n "));
        assert_eq!(
            validate_backup_phrase(&messy, BackupPolicy::Strict).unwrap(),
            PHRASE
        );
    }

    #[test]
    fn test_generate_word_counts() {
        let phrase = generate_backup_phrase(None).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        let phrase = generate_backup_phrase(Some(24)).unwrap();
        assert!(validate_backup_phrase(&phrase, BackupPolicy::Strict).is_ok());
        assert!(generate_backup_phrase(Some(13)).is_err());
    }

    #[test]
    fn test_scan_key_is_compressed_and_network_scoped() {
        let main = stealth_scan_key(PHRASE, NetworkType::Mainnet).unwrap();
        let test = stealth_scan_key(PHRASE, NetworkType::Testnet).unwrap();
        assert_eq!(main.address.len(), 33);
        assert!(main.address[0] == 0x02 || main.address[0] == 0x03);
        assert_ne!(main, test);
        assert_eq!(main.network, "?");
    }

    #[test]
    fn test_scan_key_path() {
        assert_eq!(scan_key_path(NetworkType::Mainnet), "m/352'/0'/0'/1'/0");
        assert_eq!(scan_key_path(NetworkType::Regtest), "m/352'/1'/0'/1'/0");
    }
}
