//! Domain state resolver
//!
//! Rebuilds a domain's ownership and forwarding table from the transactions
//! that paid its notification address. Resolution is a pure function of
//! (alias, history, height): nothing is cached between calls.
//!
//! Records are replayed in (block height, block index, txid) order. The
//! first record that satisfies the claim rule makes its funder the owner;
//! later records count only when funded by the current owner, and a
//! transfer command hands ownership on. Records confirmed above the
//! resolved height and mempool records are provisional: they feed the
//! provisional view but never the confirmed one.

use crate::alias::{Alias, NotificationAddress};
use crate::command::{interpret, TRANSFER_COMMAND};
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use crate::forwards::{
    find_latest_forwards, ForwardRecord, ForwardingRegistry, PROVISIONAL_HEIGHT,
};
use crate::payload::{EmbeddedPayload, Token};
use crate::record::TransactionRecord;
use crate::script::{canonical_address, same_address};
use crate::Result;
use bns_params::NetworkType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Current owner and the record that made it so
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// Owner address (funder of the granting record, or transfer target)
    pub address: String,
    /// Record that granted ownership
    pub txid: String,
    /// Height of that record (`PROVISIONAL_HEIGHT` if not yet confirmed)
    pub height: u64,
}

/// Activation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainStatus {
    /// Claim has matured
    Active,
    /// Claim is waiting out the activation delay
    Pending {
        /// First height at which the domain is active
        activates_at: u64,
    },
}

/// Why a qualifying record was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Funded by someone other than the current owner
    Unauthorized {
        /// Funding address, if known
        funder: Option<String>,
    },
    /// Claim paid less than the minimum claim value
    ClaimBelowMinimum {
        /// Paid to the notification address
        paid: u64,
        /// Required
        min: u64,
    },
    /// Claim has no funding input with a known address
    MissingFunder,
    /// Embedded data could not be decoded
    MalformedPayload {
        /// Decoder message
        detail: String,
    },
    /// Transfer command names an address that is invalid on the network
    InvalidTransfer {
        /// Offending value
        address: String,
    },
}

/// Qualifying record that was tracked but not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Transaction id
    pub txid: String,
    /// Block height, if mined
    pub height: Option<u64>,
    /// Reason
    #[serde(flatten)]
    pub reason: RejectionReason,
    /// Whether the record was provisional
    pub provisional: bool,
}

/// Resolved snapshot of one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainState {
    /// Resolved alias
    pub alias: Alias,
    /// Address that was scanned
    pub notification_address: NotificationAddress,
    /// Current owner at the resolved height
    pub owner: Ownership,
    /// Original claim
    pub claim: Ownership,
    /// Activation state at the resolved height
    pub status: DomainStatus,
    /// Active forwarding table (network -> address)
    pub active_forwards: BTreeMap<String, String>,
    /// Owner once provisional records are applied
    pub provisional_owner: String,
    /// Forwarding table once provisional records are applied
    pub provisional_forwards: BTreeMap<String, String>,
    /// Height of the most recent applied confirmed record
    pub last_update_height: u64,
    /// Applied confirmed forward writes in replay order
    pub forwards: Vec<ForwardRecord>,
    /// Records tracked but not applied
    pub rejected: Vec<RejectedRecord>,
    /// Provisional record ids, in replay order
    pub pending: Vec<String>,
    /// Height the snapshot was resolved at
    pub resolved_height: u64,
}

impl DomainState {
    /// Active forwarding address for a network
    pub fn forward(&self, network: &str) -> Option<&str> {
        self.active_forwards.get(network).map(String::as_str)
    }

    /// Owner address
    pub fn owner_address(&self) -> &str {
        &self.owner.address
    }

    /// Check whether an address currently owns the domain
    ///
    /// Addresses match when they pay the same output script, so case
    /// variants of a bech32 owner are recognized.
    pub fn is_owned_by(&self, address: &str) -> bool {
        same_address(
            &self.owner.address,
            address,
            self.notification_address.network(),
        )
    }

    /// Check whether provisional records are waiting
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Past writes per network, newest first
    pub fn forward_history(&self) -> BTreeMap<String, Vec<ForwardRecord>> {
        find_latest_forwards(&self.forwards)
    }
}

/// Resolves one alias on one network
#[derive(Debug, Clone)]
pub struct DomainResolver {
    alias: Alias,
    network: NetworkType,
    notification: NotificationAddress,
    config: ResolverConfig,
}

impl DomainResolver {
    /// Create resolver, deriving the notification address
    pub fn new(alias: Alias, network: NetworkType, config: ResolverConfig) -> Result<Self> {
        let notification = alias.notification_address(network)?;
        Ok(Self {
            alias,
            network,
            notification,
            config,
        })
    }

    /// Alias being resolved
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    /// Notification address scanned for history
    pub fn notification_address(&self) -> &NotificationAddress {
        &self.notification
    }

    /// Resolve a snapshot from the address history at `current_height`
    pub fn resolve(
        &self,
        history: &[TransactionRecord],
        current_height: u64,
    ) -> std::result::Result<DomainState, ResolutionError> {
        let (confirmed, provisional) = self.order(history, current_height);

        if confirmed.is_empty() && provisional.is_empty() {
            tracing::debug!("{} has no history at {}", self.alias, self.notification);
            return Err(self.no_history());
        }

        let mut replay = Replay::new(self);
        for record in &confirmed {
            if let Some((height, index)) = record.position() {
                replay.apply(record, height, index, false);
            }
        }

        let Some(owner) = replay.owner.clone() else {
            if provisional.is_empty() {
                tracing::debug!("{} has no valid claim", self.alias);
                return Err(self.no_history());
            }
            tracing::info!(
                "{} has {} provisional record(s) and no confirmed claim",
                self.alias,
                provisional.len()
            );
            return Err(ResolutionError::IncompleteHistory {
                alias: self.alias.full_name(),
                pending: provisional.len(),
            });
        };
        let Some(claim) = replay.claim.clone() else {
            return Err(self.no_history());
        };

        let active_forwards = replay.registry.resolve_active();
        let forwards = replay.registry.records().to_vec();
        let last_update_height = replay.last_update_height;

        let mut speculative = replay.clone();
        for (order, record) in provisional.iter().enumerate() {
            let order = u32::try_from(order).unwrap_or(u32::MAX);
            speculative.apply(record, PROVISIONAL_HEIGHT, order, true);
        }

        let activates_at = claim.height.saturating_add(self.config.activation_delay);
        let status = if current_height >= activates_at {
            DomainStatus::Active
        } else {
            DomainStatus::Pending { activates_at }
        };

        let provisional_owner = speculative
            .owner
            .map(|o| o.address)
            .unwrap_or_else(|| owner.address.clone());

        tracing::info!(
            "Resolved {} at height {}: owner {}, {} active forward(s), {} rejected, {} pending",
            self.alias,
            current_height,
            owner.address,
            active_forwards.len(),
            speculative.rejected.len(),
            provisional.len()
        );

        Ok(DomainState {
            alias: self.alias.clone(),
            notification_address: self.notification.clone(),
            owner,
            claim,
            status,
            active_forwards,
            provisional_owner,
            provisional_forwards: speculative.registry.resolve_active(),
            last_update_height,
            forwards,
            rejected: speculative.rejected,
            pending: provisional.iter().map(|r| r.txid.clone()).collect(),
            resolved_height: current_height,
        })
    }

    fn no_history(&self) -> ResolutionError {
        ResolutionError::NoHistory {
            alias: self.alias.full_name(),
            notification_address: self.notification.to_string(),
        }
    }

    /// Split qualifying records into confirmed and provisional, each in replay order
    fn order<'a>(
        &self,
        history: &'a [TransactionRecord],
        current_height: u64,
    ) -> (Vec<&'a TransactionRecord>, Vec<&'a TransactionRecord>) {
        let address = self.notification.as_str();
        let mut qualifying: Vec<&TransactionRecord> = history
            .iter()
            .filter(|r| r.paid_to(address) > 0)
            .collect();

        // Mined before mempool, then by position, then txid
        qualifying.sort_by(|a, b| {
            let key = |r: &TransactionRecord| r.position().map_or((1, 0, 0), |(h, i)| (0, h, i));
            key(a).cmp(&key(b)).then_with(|| a.txid.cmp(&b.txid))
        });

        let mut seen: HashSet<String> = HashSet::new();
        qualifying.retain(|r| seen.insert(r.txid.clone()));

        qualifying
            .into_iter()
            .partition(|r| matches!(r.position(), Some((h, _)) if h <= current_height))
    }
}

/// Mutable replay state; cloned to layer provisional records on top
#[derive(Debug, Clone)]
struct Replay<'r> {
    resolver: &'r DomainResolver,
    owner: Option<Ownership>,
    claim: Option<Ownership>,
    registry: ForwardingRegistry,
    rejected: Vec<RejectedRecord>,
    last_update_height: u64,
}

impl<'r> Replay<'r> {
    fn new(resolver: &'r DomainResolver) -> Self {
        Self {
            resolver,
            owner: None,
            claim: None,
            registry: ForwardingRegistry::new(),
            rejected: Vec::new(),
            last_update_height: 0,
        }
    }

    fn reject(&mut self, record: &TransactionRecord, reason: RejectionReason, provisional: bool) {
        tracing::debug!("Rejected record {}: {:?}", record.txid, reason);
        self.rejected.push(RejectedRecord {
            txid: record.txid.clone(),
            height: record.position().map(|(h, _)| h),
            reason,
            provisional,
        });
    }

    fn apply(&mut self, record: &TransactionRecord, height: u64, order: u32, provisional: bool) {
        let payload = match record.embedded_payload() {
            Some(bytes) => match EmbeddedPayload::parse(&bytes) {
                Ok(payload) => payload,
                Err(e) => {
                    let detail = e.to_string();
                    self.reject(record, RejectionReason::MalformedPayload { detail }, provisional);
                    return;
                }
            },
            None => EmbeddedPayload::default(),
        };

        let funder = record.funding_address();
        let claiming = match (&self.owner, funder) {
            (None, None) => {
                self.reject(record, RejectionReason::MissingFunder, provisional);
                return;
            }
            (None, Some(_)) => {
                let paid = record.paid_to(self.resolver.notification.as_str());
                let min = self.resolver.config.min_claim_value;
                if paid < min {
                    let reason = RejectionReason::ClaimBelowMinimum { paid, min };
                    self.reject(record, reason, provisional);
                    return;
                }
                true
            }
            (Some(owner), Some(funder))
                if same_address(&owner.address, funder, self.resolver.network) =>
            {
                false
            }
            (Some(owner), funder) => {
                tracing::warn!(
                    "Unauthorized record {} for {}: funded by {:?}, owner is {}",
                    record.txid,
                    self.resolver.alias,
                    funder,
                    owner.address
                );
                let funder = funder.map(str::to_string);
                self.reject(record, RejectionReason::Unauthorized { funder }, provisional);
                return;
            }
        };

        // Validate transfers before mutating anything
        let mut new_owner = None;
        for token in payload.tokens() {
            if let Token::Command { code, value } = token {
                if code == TRANSFER_COMMAND {
                    match canonical_address(value, self.resolver.network) {
                        Ok(address) => new_owner = Some(address),
                        Err(_) => {
                            let reason = RejectionReason::InvalidTransfer {
                                address: value.clone(),
                            };
                            self.reject(record, reason, provisional);
                            return;
                        }
                    }
                } else if interpret(code, value).is_none() {
                    tracing::debug!("Ignoring unknown command {} in {}", code, record.txid);
                }
            }
        }

        if claiming {
            let claim = Ownership {
                address: funder.map(str::to_string).unwrap_or_default(),
                txid: record.txid.clone(),
                height,
            };
            tracing::debug!(
                "Record {} claims {} for {}",
                record.txid,
                self.resolver.alias,
                claim.address
            );
            self.claim = Some(claim.clone());
            self.owner = Some(claim);
        }

        for token in payload.tokens() {
            let forward = match token {
                Token::Forward { network, address } => {
                    ForwardRecord::new(network, address, height, order)
                }
                Token::Buffer(entry) => {
                    ForwardRecord::new(&entry.network, &entry.display_address(), height, order)
                }
                Token::Command { .. } => continue,
            };
            self.registry.push(forward);
        }

        if let Some(address) = new_owner {
            tracing::debug!(
                "Record {} transfers {} to {}",
                record.txid,
                self.resolver.alias,
                address
            );
            self.owner = Some(Ownership {
                address,
                txid: record.txid.clone(),
                height,
            });
        }

        if !provisional {
            self.last_update_height = height;
        }
        tracing::debug!("Applied record {} at ({}, {})", record.txid, height, order);
    }
}
