//! Integration tests for transaction building
//!
//! Covers descriptor validation, change handling and the full
//! resolve -> plan -> build -> re-resolve cycle.

use bns_core::{
    build, plan_domain_update, Action, Alias, BuilderDefaults, BuilderError, DomainResolver,
    DustViolation, InputSpec, OutputRole, OutputSpec, PlannedChangeSet, RecordInput,
    RecordOutput, ResolverConfig, TransactionRecord, TxBuilderDescriptor, TxStatus, WalletFunds,
};
use bns_params::NetworkType;

const OWNER: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
const PAYEE: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

fn txid(byte: u8) -> String {
    hex::encode([byte; 32])
}

fn descriptor(fee_rate: f64) -> TxBuilderDescriptor {
    let mut descriptor =
        TxBuilderDescriptor::new(NetworkType::Mainnet, &BuilderDefaults::default());
    descriptor.fee_rate = fee_rate;
    descriptor
}

#[test]
fn test_fill_input_produces_change() {
    let mut d = descriptor(2.0);
    d.add_output(0, OutputSpec::payment(PAYEE, 10_000))
        .add_fill_input(InputSpec::new(&txid(1), 0, 20_000, OWNER))
        .with_change_address(OWNER);

    let tx = build(&d).unwrap();
    assert_eq!(tx.inputs.len(), 1);
    let change = tx.change.unwrap();
    assert!(change >= 500);
    assert!(tx.fee > 0 && tx.fee < 1_000);
    assert_eq!(tx.total_input(), tx.total_output() + tx.fee);
    assert!(tx.effective_fee_rate >= 1.99);
    assert_eq!(tx.change_output().map(|o| o.value), Some(change));
    assert_eq!(tx.unsigned_hex(), hex::encode(&tx.unsigned_tx));
}

#[test]
fn test_small_leftover_goes_to_fee() {
    let mut d = descriptor(1.0);
    d.add_input(0, InputSpec::new(&txid(1), 0, 10_400, OWNER))
        .add_output(0, OutputSpec::payment(PAYEE, 10_000))
        .with_change_address(OWNER);

    let tx = build(&d).unwrap();
    assert!(tx.change.is_none());
    assert_eq!(tx.fee, 400);
    assert!(tx.outputs.iter().all(|o| o.role != OutputRole::Change));
}

#[test]
fn test_leftover_without_change_address() {
    let mut d = descriptor(1.0);
    d.add_input(0, InputSpec::new(&txid(1), 0, 50_000, OWNER))
        .add_output(0, OutputSpec::payment(PAYEE, 10_000));

    assert!(matches!(
        build(&d),
        Err(BuilderError::OutputBelowDustLimit(
            DustViolation::ChangeWithoutAddress { .. }
        ))
    ));
}

#[test]
fn test_insufficient_funds_reports_shortfall() {
    let mut d = descriptor(1.0);
    d.add_input(0, InputSpec::new(&txid(1), 0, 5_000, OWNER))
        .add_fill_input(InputSpec::new(&txid(2), 0, 2_000, OWNER))
        .add_output(0, OutputSpec::payment(PAYEE, 10_000))
        .with_change_address(OWNER);

    match build(&d) {
        Err(BuilderError::InsufficientFunds {
            required,
            available,
        }) => {
            assert_eq!(available, 7_000);
            assert!(required > 10_000);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
}

#[test]
fn test_fee_rate_above_bounds() {
    let mut d = descriptor(2_000.0);
    d.add_input(0, InputSpec::new(&txid(1), 0, 1_000_000, OWNER))
        .add_output(0, OutputSpec::payment(PAYEE, 10_000))
        .with_change_address(OWNER);

    assert!(matches!(
        build(&d),
        Err(BuilderError::FeeOutOfBounds { max, .. }) if max == 1_000.0
    ));
}

#[test]
fn test_dust_output_rejected() {
    let mut d = descriptor(1.0);
    d.add_input(0, InputSpec::new(&txid(1), 0, 50_000, OWNER))
        .add_output(3, OutputSpec::payment(PAYEE, 100))
        .with_change_address(OWNER);

    assert_eq!(
        build(&d).unwrap_err(),
        BuilderError::OutputBelowDustLimit(DustViolation::RequiredOutput {
            key: 3,
            value: 100,
            min_output_value: 500,
        })
    );
}

#[test]
fn test_oversized_data_output_rejected() {
    let mut d = descriptor(1.0);
    d.add_input(0, InputSpec::new(&txid(1), 0, 50_000, OWNER))
        .add_output(0, OutputSpec::data(vec![b'x'; 81]))
        .with_change_address(OWNER);

    assert_eq!(
        build(&d).unwrap_err(),
        BuilderError::PayloadTooLarge { cost: 81, max: 80 }
    );
}

#[test]
fn test_no_inputs() {
    let mut d = descriptor(1.0);
    d.add_output(0, OutputSpec::payment(PAYEE, 10_000));
    assert_eq!(build(&d).unwrap_err(), BuilderError::NoSpendableInputs);
}

#[test]
fn test_descriptor_from_json() {
    let json = format!(
        r#"{{
            "fee_rate": 3.0,
            "inputs": {{ "0": {{ "txid": "{}", "vout": 1, "value": 30000, "address": "{}" }} }},
            "outputs": {{ "0": {{ "address": "{}", "value": 1000 }} }},
            "change_address": "{}"
        }}"#,
        txid(9),
        OWNER,
        PAYEE,
        OWNER
    );
    let d = TxBuilderDescriptor::from_json(&json).unwrap();
    assert_eq!(d.version, 2);
    assert_eq!(d.max_fee_rate, 1_000.0);

    let tx = build(&d).unwrap();
    assert_eq!(tx.inputs[0].vout, 1);
    assert!(tx.change.is_some());
}

/// Turn a built transaction into the history record a provider would report
fn as_record(tx: &bns_core::BuiltTransaction, id: u8, height: u64) -> TransactionRecord {
    TransactionRecord {
        txid: txid(id),
        status: TxStatus::Confirmed {
            block_height: height,
            block_index: 0,
        },
        inputs: tx
            .inputs
            .iter()
            .map(|i| RecordInput {
                address: i.address.clone(),
                value: i.value,
            })
            .collect(),
        outputs: tx
            .outputs
            .iter()
            .map(|o| RecordOutput {
                address: o.address.clone(),
                value: o.value,
                script_pubkey: o.script_pubkey.clone(),
            })
            .collect(),
    }
}

#[test]
fn test_plan_build_and_resolve_cycle() {
    let alias = Alias::parse("satoshi.btc").unwrap();
    let resolver =
        DomainResolver::new(alias.clone(), NetworkType::Mainnet, ResolverConfig::default())
            .unwrap();
    let defaults = BuilderDefaults::default();
    let wallet = WalletFunds {
        address: OWNER.to_string(),
        utxos: vec![
            InputSpec::new(&txid(1), 0, 100_000, OWNER),
            InputSpec::new(&txid(2), 0, 100_000, OWNER),
        ],
    };

    // Claim
    let mut changes = PlannedChangeSet::new();
    changes.set_forward("btc", OWNER).unwrap();
    let claim = plan_domain_update(
        None,
        &alias,
        NetworkType::Mainnet,
        &changes,
        &Action::claim(),
        &wallet,
        &defaults,
    )
    .unwrap();
    let claim_tx = build(&claim).unwrap();
    let mut history = vec![as_record(&claim_tx, 0xa0, 100)];

    let state = resolver.resolve(&history, 100).unwrap();
    assert_eq!(state.owner_address(), OWNER);
    assert_eq!(state.forward("btc"), Some(OWNER));

    // Update by the owner
    let mut changes = PlannedChangeSet::new();
    changes.set_forward("eth", "0xabc").unwrap();
    changes.delete_forward("btc").unwrap();
    let update = plan_domain_update(
        Some(&state),
        &alias,
        NetworkType::Mainnet,
        &changes,
        &Action::update_forwards(),
        &wallet,
        &defaults,
    )
    .unwrap();
    history.push(as_record(&build(&update).unwrap(), 0xb0, 101));

    let state = resolver.resolve(&history, 101).unwrap();
    assert!(state.forward("btc").is_none());
    assert_eq!(state.forward("eth"), Some("0xabc"));

    // A stranger's wallet cannot plan an update
    let stranger = WalletFunds {
        address: PAYEE.to_string(),
        utxos: vec![InputSpec::new(&txid(3), 0, 100_000, PAYEE)],
    };
    assert!(plan_domain_update(
        Some(&state),
        &alias,
        NetworkType::Mainnet,
        &changes,
        &Action::update_forwards(),
        &stranger,
        &defaults,
    )
    .is_err());
}
