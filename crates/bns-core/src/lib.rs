//! BNS core
//!
//! Resolves domain aliases anchored on Bitcoin from the history of their
//! notification addresses, and builds the transactions that claim, transfer
//! or update them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alias;
pub mod backup;
pub mod changes;
pub mod command;
pub mod config;
pub mod error;
pub mod fees;
pub mod forwards;
pub mod payload;
pub mod planner;
pub mod record;
pub mod resolver;
pub mod script;
pub mod selection;
pub mod transaction;

pub use alias::{Alias, NotificationAddress};
pub use backup::{generate_backup_phrase, stealth_scan_key, validate_backup_phrase, BackupPolicy};
pub use changes::{sanitize_token, ChangeExplanation, ChangeKind, PlannedChangeSet};
pub use command::{
    interpret, required_embed_fragment, Action, ActionKind, CommandMeaning, Suggestion,
    WalletGetter,
};
pub use config::{BnsConfig, BuilderDefaults, ResolverConfig};
pub use error::{BuilderError, DustViolation, Error, ErrorCategory, ResolutionError, Result};
pub use fees::{FeeCalculator, FeeRateBounds, InputScriptType, SizeEstimate};
pub use forwards::{find_latest_forwards, resolve_active, ForwardRecord, ForwardingRegistry};
pub use payload::{BufferEntry, ByteAccountant, EmbeddedPayload, Token};
pub use planner::{plan_domain_update, WalletFunds};
pub use record::{RecordInput, RecordOutput, TransactionRecord, TxStatus};
pub use resolver::{
    DomainResolver, DomainState, DomainStatus, Ownership, RejectedRecord, RejectionReason,
};
pub use selection::{InputSelector, SelectionResult, Spendable};
pub use transaction::{
    build, BuiltOutput, BuiltTransaction, InputSpec, OutputRole, OutputSpec, SignerInput,
    TransactionBuilder, TxBuilderDescriptor,
};

/// Hex encoding for byte fields
pub(crate) mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
