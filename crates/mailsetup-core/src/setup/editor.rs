//! Server settings screen logic.

use tracing::debug;

use super::flow::CheckSettingsMode;
use super::prompt::Prompt;
use super::session::SetupSession;
use crate::account::{
    HostAuth, HostAuthFlags, Protocol, ServerSide, ValidationError, validate_host_auth,
};
use crate::pipeline::{PipelineHandle, ProceedRequest, SetupPipeline, Sinks};
use crate::{Error, Result};

/// What pressing back leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackAction {
    /// Leave the screen.
    Leave,
    /// Ask first.
    Prompt(Prompt),
}

/// Incoming or outgoing server settings screen.
///
/// Keeps the settings as they were when the screen opened to detect edits.
#[derive(Debug, Clone)]
pub struct ServerSettingsEditor {
    side: ServerSide,
    loaded: Option<HostAuth>,
}

impl ServerSettingsEditor {
    /// Opens the screen for `side` of the session's account.
    #[must_use]
    pub fn new(side: ServerSide, session: &SetupSession) -> Self {
        Self {
            side,
            loaded: Self::current(side, session).cloned(),
        }
    }

    /// Side being edited.
    #[must_use]
    pub const fn side(&self) -> ServerSide {
        self.side
    }

    fn current(side: ServerSide, session: &SetupSession) -> Option<&HostAuth> {
        match side {
            ServerSide::Incoming => session.account.host_auth_recv.as_ref(),
            ServerSide::Outgoing => session.account.host_auth_send.as_ref(),
        }
    }

    fn current_mut(side: ServerSide, session: &mut SetupSession) -> Option<&mut HostAuth> {
        match side {
            ServerSide::Incoming => session.account.host_auth_recv.as_mut(),
            ServerSide::Outgoing => session.account.host_auth_send.as_mut(),
        }
    }

    /// Whether the settings differ from those loaded.
    #[must_use]
    pub fn has_unsaved_changes(&self, session: &SetupSession) -> bool {
        match (&self.loaded, Self::current(self.side, session)) {
            (Some(loaded), Some(current)) => !loaded.same_settings(current),
            (None, None) => false,
            _ => true,
        }
    }

    /// Back button. Editing an existing account asks before dropping edits.
    #[must_use]
    pub fn on_back_pressed(&self, session: &SetupSession) -> BackAction {
        if session.is_edit() && self.has_unsaved_changes(session) {
            BackAction::Prompt(Prompt::UnsavedChanges)
        } else {
            BackAction::Leave
        }
    }

    /// Next button: validates this side and starts the pipeline.
    ///
    /// Returns `None` if a run is already in flight.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the settings are incomplete, or
    /// [`Error::IllegalFlowState`] if the session refuses the check mode.
    pub fn on_next_button(
        &self,
        session: &mut SetupSession,
        pipeline: &SetupPipeline,
        sinks: Sinks,
    ) -> Result<Option<PipelineHandle>> {
        let Some(host_auth) = Self::current(self.side, session) else {
            return Err(Error::Validation(vec![match self.side {
                ServerSide::Incoming => ValidationError::MissingIncoming,
                ServerSide::Outgoing => ValidationError::MissingOutgoing,
            }]));
        };
        validate_host_auth(host_auth, self.side)?;

        let mode = match self.side {
            ServerSide::Incoming if host_auth.protocol == Protocol::Eas => {
                CheckSettingsMode::INCOMING | CheckSettingsMode::OUTGOING
            }
            ServerSide::Incoming => CheckSettingsMode::INCOMING,
            ServerSide::Outgoing => CheckSettingsMode::OUTGOING,
        };
        session.set_check_settings_mode(mode)?;
        debug!("Proceeding from {:?} settings with {mode:?}", self.side);

        Ok(pipeline.proceed(ProceedRequest::from_session(session, mode), sinks))
    }

    /// Trusts any certificate from this side's server after the user agreed.
    pub fn accept_certificate(&self, session: &mut SetupSession) {
        if let Some(host_auth) = Self::current_mut(self.side, session) {
            host_auth.flags.insert(HostAuthFlags::TRUST_ALL);
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
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::account::{Account, AccountId, ChangedFields};
    use crate::pipeline::{AccountStore, CheckResult, ConnectivityChecker, PipelineOutcome};
    use crate::setup::FlowMode;

    struct EmptyStore;

    #[async_trait]
    impl AccountStore for EmptyStore {
        async fn find_existing_account(
            &self,
            _exclude: Option<AccountId>,
            _host: &str,
            _login: &str,
        ) -> Result<Option<Account>> {
            Ok(None)
        }

        async fn save_account(&self, account: &mut Account) -> Result<()> {
            account.id = Some(AccountId::new(1));
            Ok(())
        }

        async fn update_account(
            &self,
            _account: &mut Account,
            _changed: ChangedFields,
        ) -> Result<()> {
            Ok(())
        }

        async fn backup(&self) -> Result<()> {
            Ok(())
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl ConnectivityChecker for AcceptAll {
        async fn check(&self, _mode: CheckSettingsMode, _account: &Account) -> CheckResult {
            CheckResult::Ok { policy: None }
        }
    }

    fn edit_session() -> SetupSession {
        let mut account = Account::with_email("jane@example.com");
        account.id = Some(AccountId::new(1));
        let recv = account.host_auth_recv_mut(Protocol::Imap);
        recv.address = "imap.example.com".to_string();
        recv.port = 993;
        recv.set_login("jane", "pw");
        SetupSession::builder(FlowMode::Edit).account(account).build()
    }

    #[test]
    fn test_back_without_changes_leaves() {
        let session = edit_session();
        let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);
        assert!(!editor.has_unsaved_changes(&session));
        assert_eq!(editor.on_back_pressed(&session), BackAction::Leave);
    }

    #[test]
    fn test_back_with_changes_prompts() {
        let mut session = edit_session();
        let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);
        session.account.host_auth_recv.as_mut().unwrap().port = 143;
        assert_eq!(
            editor.on_back_pressed(&session),
            BackAction::Prompt(Prompt::UnsavedChanges)
        );
    }

    #[test]
    fn test_back_in_setup_never_prompts() {
        let mut session = SetupSession::new(FlowMode::Normal);
        let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);
        session
            .apply_manual_defaults(Protocol::Imap, "jane@example.com", "pw")
            .unwrap();
        assert!(editor.has_unsaved_changes(&session));
        assert_eq!(editor.on_back_pressed(&session), BackAction::Leave);
    }

    #[test]
    fn test_accept_certificate() {
        let mut session = edit_session();
        let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);
        editor.accept_certificate(&mut session);
        assert!(
            session
                .account
                .host_auth_recv
                .unwrap()
                .flags
                .contains(HostAuthFlags::TRUST_ALL)
        );
    }

    #[tokio::test]
    async fn test_next_rejects_invalid_settings() {
        let mut session = SetupSession::new(FlowMode::Normal);
        session.select_account_type(Protocol::Imap);
        let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);
        let pipeline = SetupPipeline::new(Arc::new(EmptyStore), Arc::new(AcceptAll));

        let err = editor
            .on_next_button(&mut session, &pipeline, Sinks::new())
            .unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains(&ValidationError::EmptyIncomingHost));
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_next_runs_pipeline() {
        let mut session = SetupSession::new(FlowMode::Normal);
        session
            .apply_manual_defaults(Protocol::Imap, "jane@example.com", "pw")
            .unwrap();
        let editor = ServerSettingsEditor::new(ServerSide::Outgoing, &session);
        let pipeline = SetupPipeline::new(Arc::new(EmptyStore), Arc::new(AcceptAll));

        let handle = editor
            .on_next_button(&mut session, &pipeline, Sinks::new())
            .unwrap()
            .unwrap();
        assert_eq!(session.check_settings_mode(), CheckSettingsMode::OUTGOING);
        let PipelineOutcome::Saved(account) = handle.outcome().await.unwrap() else {
            panic!("expected saved account");
        };
        assert_eq!(account.id, Some(AccountId::new(1)));
    }
}
