//! Command interpretation and domain actions
//!
//! Commands are payload pairs whose key starts with the reserved marker.
//! They are never authored by hand: every command comes from a suggestion
//! of the chosen action, whose value is read from wallet state.

use bns_params::COMMAND_MARKER;
use serde::{Deserialize, Serialize};

/// Command transferring ownership to the address in its value
pub const TRANSFER_COMMAND: &str = "!ca";

/// Wallet state that supplies a command's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletGetter {
    /// Address that will own the domain after a transfer
    NewOwnerAddress,
}

impl WalletGetter {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            WalletGetter::NewOwnerAddress => "new owner address",
        }
    }
}

/// Entry of the command table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command code including marker
    pub code: &'static str,
    /// Human description
    pub info: &'static str,
    /// Getter supplying the value
    pub getter: WalletGetter,
}

const COMMANDS: &[CommandSpec] = &[CommandSpec {
    code: TRANSFER_COMMAND,
    info: "transfer ownership",
    getter: WalletGetter::NewOwnerAddress,
}];

/// Interpreted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMeaning {
    /// Command code including marker
    pub code: String,
    /// Human description
    pub info: &'static str,
    /// Getter supplying the value
    pub getter: WalletGetter,
    /// Value carried in the payload
    pub value: String,
}

/// Check if a token is a command
pub fn is_command(token: &str) -> bool {
    token.starts_with(COMMAND_MARKER)
}

/// Look up a command code
pub fn lookup(code: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.code == code)
}

/// Interpret a token/value pair
///
/// Unknown codes and non-command tokens yield `None`; callers fall back to
/// a generic display.
pub fn interpret(token: &str, value: &str) -> Option<CommandMeaning> {
    if !is_command(token) {
        return None;
    }
    lookup(token).map(|spec| CommandMeaning {
        code: spec.code.to_string(),
        info: spec.info,
        getter: spec.getter,
        value: value.to_string(),
    })
}

/// Domain state transition a user can choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// First notification, takes ownership
    Claim,
    /// Hand ownership to another address
    Transfer,
    /// Change forwarding information only
    UpdateForwards,
}

/// Suggestion shown under an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Description
    pub info: String,
    /// Command this suggestion requires, if any
    pub command: Option<String>,
    /// Getter feeding the value
    pub getter: Option<WalletGetter>,
    /// Value resolved from the getter
    pub value: String,
}

/// Chosen action with its suggestions in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action kind
    pub kind: ActionKind,
    /// Description
    pub info: String,
    /// Suggestions in order
    pub suggestions: Vec<Suggestion>,
}

impl Action {
    /// Claim an unregistered domain
    pub fn claim() -> Self {
        Self {
            kind: ActionKind::Claim,
            info: "claim domain".to_string(),
            suggestions: vec![Suggestion {
                info: "notify the domain address from your wallet".to_string(),
                command: None,
                getter: None,
                value: String::new(),
            }],
        }
    }

    /// Transfer ownership to `new_owner`
    pub fn transfer(new_owner: &str) -> Self {
        Self {
            kind: ActionKind::Transfer,
            info: "transfer domain".to_string(),
            suggestions: vec![Suggestion {
                info: "new owner address".to_string(),
                command: Some(TRANSFER_COMMAND.to_string()),
                getter: Some(WalletGetter::NewOwnerAddress),
                value: new_owner.to_string(),
            }],
        }
    }

    /// Update forwarding information
    pub fn update_forwards() -> Self {
        Self {
            kind: ActionKind::UpdateForwards,
            info: "update forwarding information".to_string(),
            suggestions: Vec::new(),
        }
    }

    /// Command fragment this action needs embedded
    pub fn required_embed_fragment(&self) -> String {
        required_embed_fragment(self)
    }
}

/// Concatenate every command and value declared by the action's suggestions
///
/// Follows suggestion order; no trailing separator (`""`, `"!ca addr"`).
pub fn required_embed_fragment(action: &Action) -> String {
    let mut fragment = String::new();
    for suggestion in &action.suggestions {
        if let Some(command) = &suggestion.command {
            fragment.push_str(command);
            fragment.push(' ');
            fragment.push_str(&suggestion.value);
            fragment.push(' ');
        }
    }
    fragment.pop();
    fragment
}
