//! Domain update planning
//!
//! Assembles the builder descriptor for the next state transition: pay the
//! notification address, embed the planned payload, spend the owner's coins
//! first so the resolver attributes the record to them.

use crate::alias::Alias;
use crate::changes::PlannedChangeSet;
use crate::command::{Action, ActionKind};
use crate::config::BuilderDefaults;
use crate::error::BuilderError;
use crate::resolver::DomainState;
use crate::transaction::{InputSpec, OutputSpec, TxBuilderDescriptor};
use crate::{Error, Result};
use bns_params::NetworkType;
use serde::{Deserialize, Serialize};

/// Descriptor key of the notification payment
pub const NOTIFICATION_OUTPUT: u32 = 0;
/// Descriptor key of the embedded payload
pub const PAYLOAD_OUTPUT: u32 = 1;
/// Descriptor key of the funding input
pub const FUNDING_INPUT: u32 = 0;

/// Coins and address of the acting wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFunds {
    /// Wallet address; funds the record and receives change
    pub address: String,
    /// Spendable outputs of that address, in preference order
    pub utxos: Vec<InputSpec>,
}

/// Build the descriptor for a domain update
pub fn plan_domain_update(
    state: Option<&DomainState>,
    alias: &Alias,
    network: NetworkType,
    changes: &PlannedChangeSet,
    action: &Action,
    wallet: &WalletFunds,
    defaults: &BuilderDefaults,
) -> Result<TxBuilderDescriptor> {
    match (action.kind, state) {
        (ActionKind::Claim, Some(state)) => {
            return Err(Error::InvalidAlias(format!(
                "{} is already owned by {}",
                alias,
                state.owner_address()
            )));
        }
        (ActionKind::Transfer | ActionKind::UpdateForwards, None) => {
            return Err(Error::InvalidAlias(format!("{} is not registered", alias)));
        }
        (_, Some(state)) if !state.is_owned_by(&wallet.address) => {
            return Err(Error::InvalidAddress(format!(
                "{} does not own {}",
                wallet.address, alias
            )));
        }
        _ => {}
    }

    let payload = changes.validate(action)?;

    let mut utxos = wallet.utxos.iter().cloned().map(|mut utxo| {
        utxo.address.get_or_insert_with(|| wallet.address.clone());
        utxo
    });
    let funding = utxos.next().ok_or(BuilderError::NoSpendableInputs)?;

    let notification = alias.notification_address(network)?;
    let mut descriptor = TxBuilderDescriptor::new(network, defaults);
    descriptor
        .add_input(FUNDING_INPUT, funding)
        .add_output(
            NOTIFICATION_OUTPUT,
            OutputSpec::payment(
                notification.as_str(),
                defaults.notification_value.max(defaults.min_output_value),
            ),
        )
        .with_change_address(&wallet.address);
    if !payload.is_empty() {
        descriptor.add_output(PAYLOAD_OUTPUT, OutputSpec::data(payload.to_bytes()));
    }
    for utxo in utxos {
        descriptor.add_fill_input(utxo);
    }

    tracing::info!(
        "Planned {:?} for {}: {} payload bytes, {} fill candidate(s)",
        action.kind,
        alias,
        payload.cost(),
        descriptor.fill_inputs.as_ref().map_or(0, Vec::len)
    );

    Ok(descriptor)
}
