//! Embedded payload wire format and byte accounting
//!
//! A payload is what the name system smuggles into an OP_RETURN output.
//! On the wire it is every buffer entry (`<key> <raw bytes>`) followed
//! directly by the text tokens joined with single spaces. Text tokens come
//! in pairs: `!code value` for commands, `network address` for forwards.
//! An empty address token is meaningful (it deletes a forward), so runs
//! of spaces are never collapsed.

use crate::command::is_command;
use crate::{Error, Result};
use bns_params::{BUFFER_ENTRY_LEN, BUFFER_NETWORK_KEY, BYTES_MAX, TOKEN_SEPARATOR};
use serde::{Deserialize, Serialize};

/// Number of characters kept on each side of a shortened buffer display
const SHORT_DISPLAY_CHARS: usize = 7;

/// UTF-8 byte length of a string
pub fn string_byte_count(s: &str) -> usize {
    s.len()
}

/// Computes exact wire size of candidate payloads against a fixed capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteAccountant {
    capacity: usize,
}

impl ByteAccountant {
    /// Accountant with a custom capacity
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Capacity in bytes
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Byte cost of text tokens plus buffer entries
    ///
    /// One separator between text tokens, none after the last. Each buffer
    /// entry costs its key, one separator and its raw bytes.
    pub fn cost<S: AsRef<str>>(&self, tokens: &[S], buffers: &[BufferEntry]) -> usize {
        let text: usize = tokens
            .iter()
            .map(|t| string_byte_count(t.as_ref()))
            .sum::<usize>()
            + tokens.len().saturating_sub(1);
        let binary: usize = buffers.iter().map(BufferEntry::cost).sum();
        text + binary
    }

    /// Byte cost of raw data chunks
    pub fn raw_cost<D: AsRef<[u8]>>(&self, chunks: &[D]) -> usize {
        chunks.iter().map(|c| c.as_ref().len()).sum()
    }

    /// Bytes left; negative means over budget
    pub fn remaining(&self, cost: usize) -> i64 {
        self.capacity as i64 - cost as i64
    }

    /// Check a cost against capacity
    pub fn check(&self, cost: usize) -> Result<()> {
        if cost > self.capacity {
            return Err(Error::PayloadTooLarge {
                cost,
                max: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for ByteAccountant {
    fn default() -> Self {
        Self::new(BYTES_MAX)
    }
}

/// Fixed-length binary address tagged with a reserved network key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferEntry {
    /// Reserved network key
    pub network: String,
    /// Raw address bytes
    #[serde(with = "crate::serde_hex")]
    pub address: Vec<u8>,
}

impl BufferEntry {
    /// Create a stealth (`?`) buffer entry
    pub fn stealth(address: Vec<u8>) -> Result<Self> {
        let entry = Self {
            network: BUFFER_NETWORK_KEY.to_string(),
            address,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the entry can be read back by [`EmbeddedPayload::parse`]
    pub fn validate(&self) -> Result<()> {
        if self.network != BUFFER_NETWORK_KEY {
            return Err(Error::InvalidForward(format!(
                "Buffer entries use the {:?} key, not {:?}",
                BUFFER_NETWORK_KEY, self.network
            )));
        }
        if self.address.len() != BUFFER_ENTRY_LEN {
            return Err(Error::InvalidForward(format!(
                "Stealth address must be {} bytes, got {}",
                BUFFER_ENTRY_LEN,
                self.address.len()
            )));
        }
        Ok(())
    }

    /// Wire cost: key + separator + raw bytes
    pub fn cost(&self) -> usize {
        self.network.len() + 1 + self.address.len()
    }

    /// Checksummed text form shown to users
    pub fn display_address(&self) -> String {
        bs58::encode(&self.address).with_check().into_string()
    }

    /// Shortened display (`abcdefg...tuvwxyz`)
    pub fn short_display(&self) -> String {
        let full = self.display_address();
        if full.len() <= SHORT_DISPLAY_CHARS * 2 {
            return full;
        }
        format!(
            "{}...{}",
            &full[..SHORT_DISPLAY_CHARS],
            &full[full.len() - SHORT_DISPLAY_CHARS..]
        )
    }
}

/// Payload token, classified once at parse time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Token {
    /// Control command (`!code value`)
    Command {
        /// Command code including marker
        code: String,
        /// Command value
        value: String,
    },
    /// Forwarding entry; empty address deletes
    Forward {
        /// Network key
        network: String,
        /// Forwarding address
        address: String,
    },
    /// Binary buffer entry
    Buffer(BufferEntry),
}

impl Token {
    /// Classify a text pair
    pub fn from_pair(key: &str, value: &str) -> Self {
        if is_command(key) {
            Token::Command {
                code: key.to_string(),
                value: value.to_string(),
            }
        } else {
            Token::Forward {
                network: key.to_string(),
                address: value.to_string(),
            }
        }
    }

    /// Text pair for command and forward tokens
    pub fn text_pair(&self) -> Option<(&str, &str)> {
        match self {
            Token::Command { code, value } => Some((code, value)),
            Token::Forward { network, address } => Some((network, address)),
            Token::Buffer(_) => None,
        }
    }
}

/// Decoded OP_RETURN content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedPayload {
    tokens: Vec<Token>,
}

impl EmbeddedPayload {
    /// Create from tokens in order
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parse wire bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let key = BUFFER_NETWORK_KEY.as_bytes();
        let header = key.len() + 1;

        let mut tokens = Vec::new();
        let mut rest = bytes;
        while rest.len() >= header && rest.starts_with(key) && rest[key.len()] == TOKEN_SEPARATOR {
            let end = header + BUFFER_ENTRY_LEN;
            if rest.len() < end {
                return Err(Error::MalformedPayload(format!(
                    "Buffer entry needs {} bytes, {} remain",
                    BUFFER_ENTRY_LEN,
                    rest.len() - header
                )));
            }
            tokens.push(Token::Buffer(BufferEntry {
                network: BUFFER_NETWORK_KEY.to_string(),
                address: rest[header..end].to_vec(),
            }));
            rest = &rest[end..];
        }

        let text = std::str::from_utf8(rest)
            .map_err(|e| Error::MalformedPayload(format!("Text segment is not UTF-8: {}", e)))?;
        tokens.extend(Self::parse_text(text)?.tokens);

        Ok(Self { tokens })
    }

    /// Parse a text-only payload (`key value key value ...`)
    pub fn parse_text(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::default());
        }

        let words: Vec<&str> = text.split(TOKEN_SEPARATOR as char).collect();
        if words.len() % 2 != 0 {
            return Err(Error::MalformedPayload(format!(
                "{} text tokens cannot form key/value pairs",
                words.len()
            )));
        }

        let mut tokens = Vec::with_capacity(words.len() / 2);
        for pair in words.chunks_exact(2) {
            if pair[0] == BUFFER_NETWORK_KEY {
                return Err(Error::MalformedPayload(format!(
                    "'{}' is reserved for buffer entries",
                    BUFFER_NETWORK_KEY
                )));
            }
            if pair[0].is_empty() {
                return Err(Error::MalformedPayload("Empty key token".to_string()));
            }
            tokens.push(Token::from_pair(pair[0], pair[1]));
        }
        Ok(Self { tokens })
    }

    /// Tokens in payload order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Check if payload carries nothing
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Buffer entries in order
    pub fn buffers(&self) -> Vec<BufferEntry> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Buffer(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    /// Flattened text tokens in order
    pub fn text_tokens(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(Token::text_pair)
            .flat_map(|(k, v)| [k, v])
            .collect()
    }

    /// Exact wire size
    pub fn cost(&self) -> usize {
        ByteAccountant::default().cost(&self.text_tokens(), &self.buffers())
    }

    /// Serialize to wire bytes (buffers first, then text)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.cost());
        for buffer in self.buffers() {
            bytes.extend_from_slice(buffer.network.as_bytes());
            bytes.push(TOKEN_SEPARATOR);
            bytes.extend_from_slice(&buffer.address);
        }
        let text = self.text_tokens().join(" ");
        bytes.extend_from_slice(text.as_bytes());
        bytes
    }
}
