//! Dialogs the host UI shows during setup, and what each answer means.

use crate::Error;

/// A question the host UI must put to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Another account already uses these settings.
    DuplicateAccount {
        /// Display name of the existing account.
        account_name: String,
    },
    /// Leaving would discard edited server settings.
    UnsavedChanges,
    /// The server certificate needs the user's approval.
    SecurityRequired {
        /// Server that presented the certificate.
        host: String,
    },
    /// The settings check failed.
    CheckSettingsError {
        /// Message to show.
        message: String,
    },
}

/// Answer to a [`Prompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// Positive button.
    Confirm,
    /// Negative button or dismissal.
    Cancel,
}

/// What the host UI does after a prompt is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    /// Run the pipeline again with the same settings.
    Retry,
    /// Stay on the settings screen so the user can change them.
    EditSettings,
    /// Trust the certificate and run the pipeline again.
    AcceptCertificate,
    /// Leave the settings screen without saving.
    Leave,
}

impl Prompt {
    /// Prompt for a pipeline failure, if the user has to decide something.
    #[must_use]
    pub fn for_error(error: &Error) -> Option<Self> {
        match error {
            Error::DuplicateAccount { account_name } => Some(Self::DuplicateAccount {
                account_name: account_name.clone(),
            }),
            Error::ConnectivitySecurityRequired { host } => {
                Some(Self::SecurityRequired { host: host.clone() })
            }
            Error::ConnectivityError { .. } => Some(Self::CheckSettingsError {
                message: error.to_string(),
            }),
            _ => None,
        }
    }

    /// Maps the user's answer to an action.
    #[must_use]
    pub const fn resolve(&self, choice: PromptChoice) -> PromptAction {
        match (self, choice) {
            (Self::DuplicateAccount { .. } | Self::SecurityRequired { .. }, PromptChoice::Cancel)
            | (Self::DuplicateAccount { .. }, PromptChoice::Confirm)
            | (Self::UnsavedChanges | Self::CheckSettingsError { .. }, PromptChoice::Cancel) => {
                PromptAction::EditSettings
            }
            (Self::UnsavedChanges, PromptChoice::Confirm) => PromptAction::Leave,
            (Self::SecurityRequired { .. }, PromptChoice::Confirm) => {
                PromptAction::AcceptCertificate
            }
            (Self::CheckSettingsError { .. }, PromptChoice::Confirm) => PromptAction::Retry,
        }
    }
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
    use crate::pipeline::CheckErrorReason;

    #[test]
    fn test_for_error() {
        let err = Error::DuplicateAccount {
            account_name: "Work".to_string(),
        };
        assert_eq!(
            Prompt::for_error(&err),
            Some(Prompt::DuplicateAccount {
                account_name: "Work".to_string()
            })
        );

        let err = Error::ConnectivityError {
            reason: CheckErrorReason::AuthenticationFailed,
            message: "nope".to_string(),
        };
        let Some(Prompt::CheckSettingsError { message }) = Prompt::for_error(&err) else {
            panic!("expected check settings prompt");
        };
        assert!(message.contains("authentication failed"));

        assert_eq!(Prompt::for_error(&Error::Cancelled), None);
    }

    #[test]
    fn test_resolve() {
        let duplicate = Prompt::DuplicateAccount {
            account_name: "Work".to_string(),
        };
        assert_eq!(duplicate.resolve(PromptChoice::Confirm), PromptAction::EditSettings);

        assert_eq!(
            Prompt::UnsavedChanges.resolve(PromptChoice::Confirm),
            PromptAction::Leave
        );
        assert_eq!(
            Prompt::UnsavedChanges.resolve(PromptChoice::Cancel),
            PromptAction::EditSettings
        );

        let security = Prompt::SecurityRequired {
            host: "imap.example.com".to_string(),
        };
        assert_eq!(security.resolve(PromptChoice::Confirm), PromptAction::AcceptCertificate);
        assert_eq!(security.resolve(PromptChoice::Cancel), PromptAction::EditSettings);

        let failed = Prompt::CheckSettingsError {
            message: "timeout".to_string(),
        };
        assert_eq!(failed.resolve(PromptChoice::Confirm), PromptAction::Retry);
    }
}
