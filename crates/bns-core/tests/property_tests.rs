//! Property-based tests for bns-core
//!
//! Uses proptest to verify invariants across randomized inputs

use bns_core::{
    build, resolve_active, Action, Alias, BufferEntry, BuilderError, ByteAccountant,
    DomainResolver, EmbeddedPayload, Error, ForwardRecord, InputSpec, OutputSpec,
    PlannedChangeSet, ResolverConfig, Token, TransactionRecord, TxBuilderDescriptor, TxStatus,
};
use bns_params::{NetworkType, BUFFER_ENTRY_LEN, BYTES_MAX};
use proptest::prelude::*;
use std::collections::BTreeMap;

const OWNER: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
const STRANGER: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Forward pair with a possibly empty address
fn pair_strategy() -> impl Strategy<Value = (String, String)> {
    (
        prop::string::string_regex("[a-z]{1,5}").unwrap(),
        prop::string::string_regex("[a-zA-Z0-9]{0,12}").unwrap(),
    )
}

/// Forward record over a small key space so keys collide
fn forward_strategy() -> impl Strategy<Value = ForwardRecord> {
    (
        prop::sample::select(vec!["btc", "eth", "ltc"]),
        prop::sample::select(vec!["", "A", "B", "C"]),
        0u64..5,
        0u32..3,
    )
        .prop_map(|(network, address, height, order)| {
            ForwardRecord::new(network, address, height, order)
        })
}

/// Notification record for `satoshi.btc`
fn history_strategy(notification: String) -> impl Strategy<Value = Vec<TransactionRecord>> {
    prop::collection::vec(
        (
            100u64..106,
            0u32..4,
            prop::bool::ANY,
            prop::sample::select(vec!["btc a", "btc b", "eth c", "btc ", "odd"]),
        ),
        0..8,
    )
    .prop_map(move |entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (height, index, by_owner, payload))| {
                let status = TxStatus::Confirmed {
                    block_height: height,
                    block_index: index,
                };
                let funder = if by_owner { OWNER } else { STRANGER };
                TransactionRecord::test_payment(
                    &format!("{:064x}", i),
                    status,
                    funder,
                    &notification,
                    1_000,
                )
                .with_payload(payload.as_bytes())
            })
            .collect()
    })
}

// ============================================================================
// Byte Accountant Properties
// ============================================================================

proptest! {
    /// Property: cost survives serialization and parsing
    #[test]
    fn prop_cost_round_trip(
        pairs in prop::collection::vec(pair_strategy(), 0..6),
        with_buffer in prop::bool::ANY
    ) {
        let mut tokens: Vec<Token> = Vec::new();
        if with_buffer {
            tokens.push(Token::Buffer(BufferEntry::stealth(vec![0x20; BUFFER_ENTRY_LEN]).unwrap()));
        }
        tokens.extend(pairs.iter().map(|(k, v)| Token::from_pair(k, v)));
        let payload = EmbeddedPayload::new(tokens);

        let bytes = payload.to_bytes();
        let parsed = EmbeddedPayload::parse(&bytes).unwrap();

        prop_assert_eq!(payload.cost(), bytes.len());
        prop_assert_eq!(parsed.cost(), payload.cost());
        prop_assert_eq!(parsed, payload);
    }

    /// Property: PayloadTooLarge triggers exactly above capacity
    #[test]
    fn prop_budget_boundary(len in 0usize..120) {
        let mut set = PlannedChangeSet::new();
        set.set_forward("btc", &"a".repeat(len)).unwrap();
        let action = Action::update_forwards();
        let cost = set.cost(&action).unwrap();
        prop_assert_eq!(cost, 4 + len);

        let result = set.validate(&action);
        if cost <= BYTES_MAX {
            prop_assert!(result.is_ok());
        } else {
            let over_budget = matches!(result, Err(Error::PayloadTooLarge { .. }));
            prop_assert!(over_budget);
        }
        prop_assert_eq!(
            ByteAccountant::default().remaining(cost) < 0,
            cost > BYTES_MAX
        );
    }
}

// ============================================================================
// Forwarding Registry Properties
// ============================================================================

proptest! {
    /// Property: the active entry is the latest write per network
    #[test]
    fn prop_last_write_wins(history in prop::collection::vec(forward_strategy(), 0..20)) {
        let table = resolve_active(&history);

        let mut latest: BTreeMap<&str, ((u64, u32, usize), &str)> = BTreeMap::new();
        for (i, r) in history.iter().enumerate() {
            let key = (r.origin_height, r.origin_tx_order, i);
            let entry = latest.entry(r.network.as_str()).or_insert((key, r.address.as_str()));
            if key > entry.0 {
                *entry = (key, r.address.as_str());
            }
        }
        let expected: BTreeMap<String, String> = latest
            .into_iter()
            .filter(|(_, (_, address))| !address.is_empty())
            .map(|(network, (_, address))| (network.to_string(), address.to_string()))
            .collect();

        prop_assert_eq!(table, expected);
    }
}

// ============================================================================
// Resolver Properties
// ============================================================================

proptest! {
    /// Property: resolution depends on history content, not call count or order
    #[test]
    fn prop_resolution_is_deterministic(
        history in history_strategy(
            Alias::parse("satoshi.btc")
                .unwrap()
                .notification_address(NetworkType::Mainnet)
                .unwrap()
                .to_string()
        ),
        height in 100u64..110
    ) {
        let alias = Alias::parse("satoshi.btc").unwrap();
        let resolver =
            DomainResolver::new(alias, NetworkType::Mainnet, ResolverConfig::default()).unwrap();

        let first = resolver.resolve(&history, height);
        let second = resolver.resolve(&history, height);
        let mut reversed = history.clone();
        reversed.reverse();
        let third = resolver.resolve(&reversed, height);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &third);
    }
}

// ============================================================================
// Transaction Builder Properties
// ============================================================================

proptest! {
    /// Property: change is never dust and value is conserved
    #[test]
    fn prop_change_never_dust(
        input_value in 1_000u64..200_000,
        output_value in 500u64..100_000,
        fee_rate in 1.0f64..50.0
    ) {
        let mut descriptor = TxBuilderDescriptor::default();
        descriptor.fee_rate = fee_rate;
        descriptor
            .add_input(0, InputSpec::new(&"11".repeat(32), 0, input_value, OWNER))
            .add_output(0, OutputSpec::payment(STRANGER, output_value))
            .with_change_address(OWNER);

        match build(&descriptor) {
            Ok(tx) => {
                prop_assert!(tx.change.map_or(true, |c| c >= descriptor.min_output_value));
                prop_assert_eq!(tx.total_input(), tx.total_output() + tx.fee);
                prop_assert!(tx.effective_fee_rate >= fee_rate - 0.001);
            }
            Err(BuilderError::InsufficientFunds { required, available }) => {
                prop_assert!(required > available);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}
