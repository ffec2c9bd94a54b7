//! Forwarding registry
//!
//! Forward records form an append-only log. The active table is a
//! last-write-wins replay ordered by (origin height, origin tx order);
//! an empty address deletes the key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Height assigned to records that are not confirmed at the resolved height
pub const PROVISIONAL_HEIGHT: u64 = u64::MAX;

/// One historical forwarding write
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardRecord {
    /// Network key
    pub network: String,
    /// Forwarding address (empty = deleted)
    pub address: String,
    /// Block height of the originating transaction
    pub origin_height: u64,
    /// Order of the originating transaction within its block
    pub origin_tx_order: u32,
}

impl ForwardRecord {
    /// Create a record
    pub fn new(network: &str, address: &str, origin_height: u64, origin_tx_order: u32) -> Self {
        Self {
            network: network.to_string(),
            address: address.to_string(),
            origin_height,
            origin_tx_order,
        }
    }

    /// Check if this write deletes its key
    pub fn is_deletion(&self) -> bool {
        self.address.is_empty()
    }

    /// Check if this record is not confirmed at the resolved height
    pub fn is_provisional(&self) -> bool {
        self.origin_height == PROVISIONAL_HEIGHT
    }

    fn position(&self) -> (u64, u32) {
        (self.origin_height, self.origin_tx_order)
    }
}

/// Ordered log of forward records for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardingRegistry {
    records: Vec<ForwardRecord>,
}

impl ForwardingRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from records, ordering them by position
    ///
    /// The sort is stable, so writes from the same transaction keep their
    /// payload order.
    pub fn from_records(records: Vec<ForwardRecord>) -> Self {
        let mut registry = Self { records };
        registry.records.sort_by_key(ForwardRecord::position);
        registry
    }

    /// Append a record, keeping order
    pub fn push(&mut self, record: ForwardRecord) {
        let at = self
            .records
            .partition_point(|r| r.position() <= record.position());
        self.records.insert(at, record);
    }

    /// Records in replay order
    pub fn records(&self) -> &[ForwardRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Active table over the whole log
    pub fn resolve_active(&self) -> BTreeMap<String, String> {
        replay(self.records.iter())
    }

    /// Active table considering only records at or below `height`
    pub fn resolve_active_at(&self, height: u64) -> BTreeMap<String, String> {
        replay(self.records.iter().filter(|r| r.origin_height <= height))
    }

    /// Every past write per network, newest first
    pub fn find_latest_forwards(&self) -> BTreeMap<String, Vec<ForwardRecord>> {
        let mut by_network: BTreeMap<String, Vec<ForwardRecord>> = BTreeMap::new();
        for record in self.records.iter().rev() {
            by_network
                .entry(record.network.clone())
                .or_default()
                .push(record.clone());
        }
        by_network
    }
}

fn replay<'a>(records: impl Iterator<Item = &'a ForwardRecord>) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    for record in records {
        if record.is_deletion() {
            table.remove(&record.network);
        } else {
            table.insert(record.network.clone(), record.address.clone());
        }
    }
    table
}

/// Active table for an ordered history
pub fn resolve_active(history: &[ForwardRecord]) -> BTreeMap<String, String> {
    ForwardingRegistry::from_records(history.to_vec()).resolve_active()
}

/// Past writes per network, newest first
pub fn find_latest_forwards(history: &[ForwardRecord]) -> BTreeMap<String, Vec<ForwardRecord>> {
    ForwardingRegistry::from_records(history.to_vec()).find_latest_forwards()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let history = vec![
            ForwardRecord::new("btc", "A", 100, 0),
            ForwardRecord::new("btc", "B", 101, 3),
        ];
        let table = resolve_active(&history);
        assert_eq!(table.get("btc").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_empty_address_deletes() {
        let history = vec![
            ForwardRecord::new("btc", "A", 100, 0),
            ForwardRecord::new("btc", "", 101, 0),
        ];
        assert!(resolve_active(&history).is_empty());
    }

    #[test]
    fn test_out_of_order_input_is_replayed_by_position() {
        let history = vec![
            ForwardRecord::new("btc", "", 105, 0),
            ForwardRecord::new("btc", "A", 100, 0),
            ForwardRecord::new("eth", "E", 100, 1),
        ];
        let table = resolve_active(&history);
        assert!(!table.contains_key("btc"));
        assert_eq!(table.get("eth").map(String::as_str), Some("E"));
    }

    #[test]
    fn test_same_position_keeps_payload_order() {
        let history = vec![
            ForwardRecord::new("btc", "first", 100, 2),
            ForwardRecord::new("btc", "second", 100, 2),
        ];
        assert_eq!(resolve_active(&history)["btc"], "second");
    }

    #[test]
    fn test_resolve_at_height() {
        let mut registry = ForwardingRegistry::new();
        registry.push(ForwardRecord::new("btc", "A", 100, 0));
        registry.push(ForwardRecord::new("btc", "B", 102, 0));
        registry.push(ForwardRecord::new("ltc", "L", 101, 0));

        let at_101 = registry.resolve_active_at(101);
        assert_eq!(at_101["btc"], "A");
        assert_eq!(at_101["ltc"], "L");
        assert_eq!(registry.resolve_active_at(102)["btc"], "B");
        assert!(registry.resolve_active_at(99).is_empty());
    }

    #[test]
    fn test_push_keeps_order() {
        let mut registry = ForwardingRegistry::new();
        registry.push(ForwardRecord::new("btc", "B", 102, 0));
        registry.push(ForwardRecord::new("btc", "A", 100, 0));
        assert_eq!(registry.records()[0].address, "A");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_find_latest_forwards_lists_all_writes_newest_first() {
        let history = vec![
            ForwardRecord::new("btc", "A", 100, 0),
            ForwardRecord::new("eth", "E", 100, 1),
            ForwardRecord::new("btc", "", 101, 0),
            ForwardRecord::new("btc", "C", 102, 0),
        ];
        let latest = find_latest_forwards(&history);
        let btc: Vec<&str> = latest["btc"].iter().map(|r| r.address.as_str()).collect();
        assert_eq!(btc, vec!["C", "", "A"]);
        assert_eq!(latest["eth"].len(), 1);
    }
}
