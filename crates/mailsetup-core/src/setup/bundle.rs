//! Saving and restoring a session across host restarts.

use serde::{Deserialize, Serialize};

use super::flow::{CheckSettingsMode, FlowMode};
use super::session::{AuthenticatorResponse, SetupSession};
use crate::account::{Account, Policy};
use crate::error::{Error, Result};

/// Current bundle format version.
pub const BUNDLE_VERSION: u32 = 1;

/// Serialized form of a [`SetupSession`]. Every session field is carried.
#[derive(Debug, Serialize, Deserialize)]
struct SessionBundle {
    version: u32,
    flow_mode: FlowMode,
    account: Account,
    original: Option<Account>,
    username: String,
    password: String,
    check_settings_mode: u32,
    allow_autodiscover: bool,
    policy: Option<Policy>,
    auto_setup: bool,
    is_default: bool,
    authenticator_response: Option<AuthenticatorResponse>,
}

impl SetupSession {
    /// Serializes the session, including typed credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bundle(&self) -> Result<Vec<u8>> {
        let bundle = SessionBundle {
            version: BUNDLE_VERSION,
            flow_mode: self.flow_mode,
            account: self.account.clone(),
            original: self.original.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            check_settings_mode: self.check_settings_mode.bits(),
            allow_autodiscover: self.allow_autodiscover,
            policy: self.policy.clone(),
            auto_setup: self.auto_setup,
            is_default: self.is_default,
            authenticator_response: self.authenticator_response.clone(),
        };
        Ok(serde_json::to_vec(&bundle)?)
    }

    /// Restores a session from [`SetupSession::to_bundle`] output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bundle`] for a different format version or unknown check
    /// bits, or a serialization error for malformed input.
    pub fn from_bundle(bytes: &[u8]) -> Result<Self> {
        let bundle: SessionBundle = serde_json::from_slice(bytes)?;
        if bundle.version != BUNDLE_VERSION {
            return Err(Error::Bundle(format!(
                "unsupported bundle version {} (expected {BUNDLE_VERSION})",
                bundle.version
            )));
        }
        let check_settings_mode = CheckSettingsMode::from_bits(bundle.check_settings_mode)
            .ok_or_else(|| {
                Error::Bundle(format!(
                    "unknown check settings bits {:#x}",
                    bundle.check_settings_mode
                ))
            })?;
        Ok(Self {
            flow_mode: bundle.flow_mode,
            account: bundle.account,
            original: bundle.original,
            username: bundle.username,
            password: bundle.password,
            check_settings_mode,
            allow_autodiscover: bundle.allow_autodiscover,
            policy: bundle.policy,
            auto_setup: bundle.auto_setup,
            is_default: bundle.is_default,
            authenticator_response: bundle.authenticator_response,
        })
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
    use crate::account::{AccountId, Protocol};

    #[test]
    fn test_restore_edit_session() {
        let mut account = Account::with_email("jane@example.com");
        account.id = Some(AccountId::new(3));
        let mut session = SetupSession::builder(FlowMode::Edit)
            .account(account)
            .build();
        session
            .apply_manual_defaults(Protocol::Imap, "jane@example.com", "pw")
            .unwrap();
        session
            .set_check_settings_mode(CheckSettingsMode::INCOMING | CheckSettingsMode::OUTGOING)
            .unwrap();

        let bytes = session.to_bundle().unwrap();
        let restored = SetupSession::from_bundle(&bytes).unwrap();

        assert_eq!(restored.flow_mode(), FlowMode::Edit);
        assert_eq!(restored.account, session.account);
        assert_eq!(restored.original(), session.original());
        assert_eq!(restored.check_settings_mode(), session.check_settings_mode());
        assert_eq!(restored.changed_fields(), session.changed_fields());
        assert_eq!(restored.password, "pw");
        assert_eq!(restored, session);
    }

    #[test]
    fn test_restore_account_manager_eas_session() {
        let mut session = SetupSession::builder(FlowMode::AccountManagerEas)
            .authenticator_response(AuthenticatorResponse("h".to_string()))
            .build();
        session.initial_step();
        session
            .apply_manual_defaults(Protocol::Eas, "jane@corp.example", "pw")
            .unwrap();
        session.is_default = true;
        session.policy = Some(Policy {
            require_encryption: true,
            ..Default::default()
        });
        session
            .set_check_settings_mode(CheckSettingsMode::AUTODISCOVER)
            .unwrap();

        let mut restored = SetupSession::from_bundle(&session.to_bundle().unwrap()).unwrap();

        assert_eq!(restored, session);
        assert!(restored.allow_autodiscover);
        assert!(restored.is_default);
        assert_eq!(restored.username, "jane@corp.example");
        assert_eq!(
            restored.authenticator_response,
            Some(AuthenticatorResponse("h".to_string()))
        );
        restored
            .set_check_settings_mode(CheckSettingsMode::AUTODISCOVER)
            .unwrap();
        restored.finalize_account();
        assert!(restored.account.is_default());
    }

    #[test]
    fn test_rejects_other_version() {
        let session = SetupSession::default();
        let mut value: serde_json::Value =
            serde_json::from_slice(&session.to_bundle().unwrap()).unwrap();
        value["version"] = serde_json::json!(2);
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(
            SetupSession::from_bundle(&bytes),
            Err(Error::Bundle(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_check_bits() {
        let session = SetupSession::default();
        let mut value: serde_json::Value =
            serde_json::from_slice(&session.to_bundle().unwrap()).unwrap();
        value["check_settings_mode"] = serde_json::json!(64);
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(
            SetupSession::from_bundle(&bytes),
            Err(Error::Bundle(_))
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            SetupSession::from_bundle(b"not json"),
            Err(Error::Serde(_))
        ));
    }
}
