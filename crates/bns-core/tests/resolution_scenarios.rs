//! Integration tests for domain resolution
//!
//! Replays notification histories from claim through updates, transfers
//! and unconfirmed activity.

use bns_core::{
    Alias, DomainResolver, DomainStatus, RejectionReason, ResolutionError, ResolverConfig,
    TransactionRecord, TxStatus,
};
use bns_params::NetworkType;

const X: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
const Y: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

fn resolver() -> DomainResolver {
    let alias = Alias::parse("satoshi.btc").unwrap();
    DomainResolver::new(alias, NetworkType::Mainnet, ResolverConfig::default()).unwrap()
}

fn confirmed(block_height: u64, block_index: u32) -> TxStatus {
    TxStatus::Confirmed {
        block_height,
        block_index,
    }
}

fn notify(
    resolver: &DomainResolver,
    txid: &str,
    status: TxStatus,
    funder: &str,
) -> TransactionRecord {
    TransactionRecord::test_payment(
        &txid.repeat(64 / txid.len()),
        status,
        funder,
        resolver.notification_address().as_str(),
        100_000,
    )
}

fn scenario_history(resolver: &DomainResolver) -> Vec<TransactionRecord> {
    vec![
        notify(resolver, "a1", confirmed(100, 3), X),
        notify(resolver, "b2", confirmed(101, 7), X).with_payload(b"btc bc1qexample"),
        notify(resolver, "c3", confirmed(102, 1), Y).with_payload(b"btc evil"),
    ]
}

#[test]
fn test_claim_sets_owner() {
    let r = resolver();
    let history = &scenario_history(&r)[..1];
    let state = r.resolve(history, 100).unwrap();

    assert_eq!(state.owner_address(), X);
    assert!(state.active_forwards.is_empty());
    assert_eq!(state.claim.height, 100);
    assert_eq!(state.status, DomainStatus::Active);
}

#[test]
fn test_owner_update_sets_forward() {
    let r = resolver();
    let history = &scenario_history(&r)[..2];
    let state = r.resolve(history, 101).unwrap();

    assert_eq!(state.forward("btc"), Some("bc1qexample"));
    assert_eq!(state.last_update_height, 101);
}

#[test]
fn test_stranger_update_is_unauthorized() {
    let r = resolver();
    let state = r.resolve(&scenario_history(&r), 102).unwrap();

    assert_eq!(state.owner_address(), X);
    assert_eq!(state.forward("btc"), Some("bc1qexample"));
    assert_eq!(state.rejected.len(), 1);
    assert_eq!(
        state.rejected[0].reason,
        RejectionReason::Unauthorized {
            funder: Some(Y.to_string())
        }
    );
    assert_eq!(state.last_update_height, 101);
}

#[test]
fn test_deletion_removes_forward() {
    let r = resolver();
    let mut history = scenario_history(&r);
    history.push(notify(&r, "d4", confirmed(103, 0), X).with_payload(b"btc "));
    let state = r.resolve(&history, 103).unwrap();

    assert!(state.forward("btc").is_none());
    let btc_history = &state.forward_history()["btc"];
    assert_eq!(btc_history[0].address, "");
    assert_eq!(btc_history[1].address, "bc1qexample");
}

#[test]
fn test_same_block_position_breaks_tie_by_txid() {
    let r = resolver();
    let history = vec![
        notify(&r, "a1", confirmed(100, 0), X),
        notify(&r, "ff", confirmed(101, 2), X).with_payload(b"btc second"),
        notify(&r, "ee", confirmed(101, 2), X).with_payload(b"btc first"),
    ];
    let state = r.resolve(&history, 101).unwrap();
    assert_eq!(state.forward("btc"), Some("second"));
}

#[test]
fn test_first_valid_claim_wins() {
    let r = resolver();
    let history = vec![
        notify(&r, "b2", confirmed(100, 5), X),
        notify(&r, "a1", confirmed(100, 1), Y),
    ];
    let state = r.resolve(&history, 100).unwrap();
    assert_eq!(state.owner_address(), Y);
    assert!(matches!(
        state.rejected[0].reason,
        RejectionReason::Unauthorized { .. }
    ));
}

#[test]
fn test_unregistered_domain() {
    let r = resolver();
    let result = r.resolve(&[], 100);
    match result {
        Err(ResolutionError::NoHistory {
            alias,
            notification_address,
        }) => {
            assert_eq!(alias, "satoshi.btc");
            assert_eq!(notification_address, r.notification_address().to_string());
        }
        other => panic!("expected NoHistory, got {:?}", other),
    }
}

#[test]
fn test_unconfirmed_claim_is_incomplete() {
    let r = resolver();
    let history = vec![notify(&r, "a1", TxStatus::Unconfirmed, X)];
    assert!(matches!(
        r.resolve(&history, 100),
        Err(ResolutionError::IncompleteHistory { pending: 1, .. })
    ));
}

#[test]
fn test_mempool_update_is_provisional() {
    let r = resolver();
    let mut history = scenario_history(&r);
    history.push(notify(&r, "e5", TxStatus::Unconfirmed, X).with_payload(b"eth 0xpending"));
    let state = r.resolve(&history, 102).unwrap();

    assert!(state.forward("eth").is_none());
    assert_eq!(
        state.provisional_forwards.get("eth").map(String::as_str),
        Some("0xpending")
    );
    assert!(state.has_pending());
    assert_eq!(state.provisional_owner, X);
}

#[test]
fn test_transfer_then_new_owner_updates() {
    let r = resolver();
    let transfer = format!("!ca {}", Y);
    let mut history = scenario_history(&r);
    history.push(notify(&r, "d4", confirmed(103, 0), X).with_payload(transfer.as_bytes()));
    history.push(notify(&r, "e5", confirmed(104, 0), Y).with_payload(b"btc fresh"));
    let state = r.resolve(&history, 104).unwrap();

    assert_eq!(state.owner_address(), Y);
    assert_eq!(state.owner.height, 103);
    assert_eq!(state.claim.address, X);
    assert_eq!(state.forward("btc"), Some("fresh"));
}

#[test]
fn test_re_resolution_with_growing_history() {
    let r = resolver();
    let history = scenario_history(&r);
    let early = r.resolve(&history, 100).unwrap();
    let late = r.resolve(&history, 102).unwrap();

    assert!(early.forward("btc").is_none());
    assert_eq!(early.provisional_forwards.get("btc").map(String::as_str), Some("bc1qexample"));
    assert_eq!(late.forward("btc"), Some("bc1qexample"));
    assert_eq!(r.resolve(&history, 102).unwrap(), late);
}
