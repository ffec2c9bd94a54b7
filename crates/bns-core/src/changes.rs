//! Planned change sets
//!
//! A change set is what the user is about to embed: forward edits (an empty
//! address deletes), buffer entries, and the command fragment of the chosen
//! action. Entries keep their insertion order; editing a key replaces its
//! value in place.

use crate::command::{interpret, is_command, Action};
use crate::payload::{BufferEntry, ByteAccountant, EmbeddedPayload, Token};
use crate::{Error, Result};
use bns_params::BUFFER_NETWORK_KEY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keep the first line of user input and drop all whitespace
pub fn sanitize_token(input: &str) -> String {
    input
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// How a planned change will be read once embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    /// Command derived from the chosen action
    Command {
        /// Human description, if the code is known
        info: Option<String>,
    },
    /// Stealth address buffer
    Stealth,
    /// Forward set or replaced
    Update,
    /// Forward deleted
    Delete,
}

/// One planned change as shown for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeExplanation {
    /// Network key or command code
    pub key: String,
    /// Value as displayed
    pub value: String,
    /// Interpretation
    pub kind: ChangeKind,
    /// Bytes this change adds to the payload
    pub cost: usize,
    /// Whether the user may remove it
    pub allow_removal: bool,
}

/// User-authored forwarding delta
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChangeSet {
    entries: Vec<(String, String)>,
    buffers: Vec<BufferEntry>,
    #[serde(skip)]
    accountant: ByteAccountant,
}

impl PlannedChangeSet {
    /// Empty change set with the default capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom capacity
    pub fn with_accountant(mut self, accountant: ByteAccountant) -> Self {
        self.accountant = accountant;
        self
    }

    /// Restore from a stored embed string
    pub fn from_embed_string(embed: &str) -> Result<Self> {
        let payload = EmbeddedPayload::parse_text(embed)?;
        let mut set = Self::new();
        for (key, value) in payload.tokens().iter().filter_map(Token::text_pair) {
            set.upsert(key, value);
        }
        Ok(set)
    }

    /// Entries joined for storage (`key value key value`)
    pub fn embed_string(&self) -> String {
        join_pairs(&self.entries)
    }

    /// Planned text entries in order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Planned buffer entries in order
    pub fn buffers(&self) -> &[BufferEntry] {
        &self.buffers
    }

    /// Check if nothing is planned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.buffers.is_empty()
    }

    /// Plan a forward for a network (empty address deletes)
    pub fn set_forward(&mut self, network: &str, address: &str) -> Result<()> {
        let network = sanitize_token(network);
        if network.is_empty() {
            return Err(Error::InvalidForward("Network cannot be empty".to_string()));
        }
        if network == BUFFER_NETWORK_KEY {
            return Err(Error::InvalidForward(format!(
                "'{}' is reserved for buffer entries",
                BUFFER_NETWORK_KEY
            )));
        }
        if is_command(&network) {
            return Err(Error::InvalidForward(format!(
                "'{}' is a command; commands come from the chosen action",
                network
            )));
        }
        self.upsert(&network, &sanitize_token(address));
        Ok(())
    }

    /// Plan deletion of a network's forward
    pub fn delete_forward(&mut self, network: &str) -> Result<()> {
        self.set_forward(network, "")
    }

    /// Drop a planned entry; returns whether it was planned
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        if is_command(key) {
            return Err(Error::CommandNotRemovable(key.to_string()));
        }
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        Ok(self.entries.len() != before)
    }

    /// Plan a buffer entry, replacing one with the same key
    pub fn add_buffer(&mut self, entry: BufferEntry) -> Result<()> {
        entry.validate()?;
        match self.buffers.iter_mut().find(|b| b.network == entry.network) {
            Some(existing) => *existing = entry,
            None => self.buffers.push(entry),
        }
        Ok(())
    }

    /// Drop a planned buffer entry; returns whether it was planned
    pub fn remove_buffer(&mut self, network: &str) -> bool {
        let before = self.buffers.len();
        self.buffers.retain(|b| b.network != network);
        self.buffers.len() != before
    }

    /// Whether a stealth address may still be added
    pub fn can_add_stealth(&self, active_forwards: &BTreeMap<String, String>) -> bool {
        !self.buffers.iter().any(|b| b.network == BUFFER_NETWORK_KEY)
            && !active_forwards.contains_key(BUFFER_NETWORK_KEY)
    }

    /// Entries merged with the action's command fragment
    ///
    /// A command already planned keeps its position and takes the action's value.
    pub fn planned_changes(&self, action: &Action) -> Result<Vec<(String, String)>> {
        let fragment = EmbeddedPayload::parse_text(&action.required_embed_fragment())?;
        let mut merged = self.clone();
        for (key, value) in fragment.tokens().iter().filter_map(Token::text_pair) {
            merged.upsert(key, value);
        }
        Ok(merged.entries)
    }

    /// Payload that would be embedded
    pub fn payload(&self, action: &Action) -> Result<EmbeddedPayload> {
        let mut tokens: Vec<Token> = self.buffers.iter().cloned().map(Token::Buffer).collect();
        tokens.extend(
            self.planned_changes(action)?
                .iter()
                .map(|(k, v)| Token::from_pair(k, v)),
        );
        Ok(EmbeddedPayload::new(tokens))
    }

    /// Exact payload bytes
    pub fn cost(&self, action: &Action) -> Result<usize> {
        let planned = self.planned_changes(action)?;
        let tokens: Vec<&str> = planned
            .iter()
            .flat_map(|(k, v)| [k.as_str(), v.as_str()])
            .collect();
        Ok(self.accountant.cost(&tokens, &self.buffers))
    }

    /// Bytes left; negative when over budget
    pub fn remaining(&self, action: &Action) -> Result<i64> {
        Ok(self.accountant.remaining(self.cost(action)?))
    }

    /// Bytes to remove before the payload fits
    pub fn over_budget_by(&self, action: &Action) -> Result<usize> {
        let cost = self.cost(action)?;
        Ok(cost.saturating_sub(self.accountant.capacity()))
    }

    /// Payload ready to embed, or `PayloadTooLarge`
    pub fn validate(&self, action: &Action) -> Result<EmbeddedPayload> {
        for entry in &self.buffers {
            entry.validate()?;
        }
        let cost = self.cost(action)?;
        self.accountant.check(cost)?;
        self.payload(action)
    }

    /// Describe every planned change for review
    pub fn explain(&self, action: &Action) -> Result<Vec<ChangeExplanation>> {
        let mut explanations: Vec<ChangeExplanation> = self
            .buffers
            .iter()
            .map(|b| ChangeExplanation {
                key: b.network.clone(),
                value: b.short_display(),
                kind: ChangeKind::Stealth,
                cost: b.cost(),
                allow_removal: true,
            })
            .collect();

        for (key, value) in self.planned_changes(action)? {
            let kind = if is_command(&key) {
                ChangeKind::Command {
                    info: interpret(&key, &value).map(|m| m.info.to_string()),
                }
            } else if value.is_empty() {
                ChangeKind::Delete
            } else {
                ChangeKind::Update
            };
            explanations.push(ChangeExplanation {
                // pair plus the separator joining it to its neighbour
                cost: self.accountant.cost(&[&key, &value], &[]) + 1,
                allow_removal: !is_command(&key),
                key,
                value,
                kind,
            });
        }
        Ok(explanations)
    }

    fn upsert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .flat_map(|(k, v)| [k.as_str(), v.as_str()])
        .collect::<Vec<_>>()
        .join(" ")
}
