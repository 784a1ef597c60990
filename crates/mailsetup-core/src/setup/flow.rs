//! Flow modes and steps of the account setup flow.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::account::Protocol;

/// How the setup flow was entered and where it returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    /// New account started from the app.
    #[default]
    Normal,
    /// New Exchange account started from the system account manager.
    AccountManagerEas,
    /// New POP/IMAP account started from the system account manager.
    AccountManagerPopImap,
    /// Editing an existing account.
    Edit,
    /// New account forced by a caller (e.g. no account exists yet).
    ForceCreate,
    /// Finished; hand control back to the caller.
    ReturnToCaller,
    /// Finished; show the message list.
    ReturnToMessageList,
}

impl FlowMode {
    /// Whether this mode creates a new account.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(
            self,
            Self::Normal | Self::AccountManagerEas | Self::AccountManagerPopImap | Self::ForceCreate
        )
    }

    /// Whether the flow was started by the system account manager.
    #[must_use]
    pub const fn is_account_manager(&self) -> bool {
        matches!(self, Self::AccountManagerEas | Self::AccountManagerPopImap)
    }

    /// Whether this mode ends the flow.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ReturnToCaller | Self::ReturnToMessageList)
    }

    /// Terminal mode the flow moves to when it completes from this mode.
    #[must_use]
    pub const fn completion(&self) -> Self {
        match self {
            Self::Normal | Self::ReturnToMessageList => Self::ReturnToMessageList,
            Self::AccountManagerEas
            | Self::AccountManagerPopImap
            | Self::Edit
            | Self::ForceCreate
            | Self::ReturnToCaller => Self::ReturnToCaller,
        }
    }
}

bitflags! {
    /// External checks the pipeline runs before saving.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CheckSettingsMode: u32 {
        /// Check the incoming server.
        const INCOMING = 1;
        /// Check the outgoing server.
        const OUTGOING = 2;
        /// Run Exchange autodiscover.
        const AUTODISCOVER = 4;
    }
}

/// Screen the host UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// Email address and password entry.
    Basics,
    /// Choice between POP3, IMAP and Exchange.
    AccountType,
    /// Server settings for the given incoming protocol.
    ServerSettings(Protocol),
    /// Sync and notification options.
    Options,
    /// Nothing left; leave the flow.
    Done,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_classes() {
        assert!(FlowMode::Normal.is_create());
        assert!(FlowMode::ForceCreate.is_create());
        assert!(!FlowMode::Edit.is_create());
        assert!(FlowMode::AccountManagerEas.is_account_manager());
        assert!(FlowMode::ReturnToCaller.is_terminal());
        assert!(!FlowMode::Edit.is_terminal());
    }

    #[test]
    fn test_completion() {
        assert_eq!(FlowMode::Normal.completion(), FlowMode::ReturnToMessageList);
        assert_eq!(FlowMode::Edit.completion(), FlowMode::ReturnToCaller);
        assert_eq!(
            FlowMode::AccountManagerPopImap.completion(),
            FlowMode::ReturnToCaller
        );
    }

    #[test]
    fn test_check_mode_bits() {
        assert_eq!(CheckSettingsMode::INCOMING.bits(), 1);
        assert_eq!(CheckSettingsMode::OUTGOING.bits(), 2);
        assert_eq!(CheckSettingsMode::AUTODISCOVER.bits(), 4);
    }
}
