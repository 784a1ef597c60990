//! Caller-owned state of one setup or edit session.

use mailsetup_provider::{Provider, ServerRole, infer_server_name, split_email};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::flow::{CheckSettingsMode, FlowMode, SetupStep};
use crate::account::{
    Account, AccountFlags, ChangedFields, HostAuth, HostAuthFlags, Policy, Protocol,
    ValidationError,
};
use crate::error::{Error, Result};

/// Opaque handle for answering the system account manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorResponse(pub String);

/// State of one account setup or edit session.
///
/// The host UI owns the session and passes it to every step. Starting a new
/// session, or restarting this one, goes through [`SetupSession::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSession {
    pub(super) flow_mode: FlowMode,
    /// Account being created or edited.
    pub account: Account,
    /// Account as loaded, when editing.
    pub(super) original: Option<Account>,
    /// Username typed on the basics screen.
    pub username: String,
    /// Password typed on the basics screen.
    pub password: String,
    pub(super) check_settings_mode: CheckSettingsMode,
    /// Whether Exchange autodiscover may run in this session.
    pub allow_autodiscover: bool,
    /// Policy returned by the server during checks.
    pub policy: Option<Policy>,
    /// Whether settings came from a provider catalog.
    pub auto_setup: bool,
    /// Whether the new account becomes the default.
    pub is_default: bool,
    /// Account-manager response handle, when started from there.
    pub authenticator_response: Option<AuthenticatorResponse>,
}

/// Builder for [`SetupSession`].
#[derive(Debug)]
pub struct SetupSessionBuilder {
    flow_mode: FlowMode,
    account: Option<Account>,
    authenticator_response: Option<AuthenticatorResponse>,
    allow_autodiscover: bool,
}

impl SetupSessionBuilder {
    /// Adopts an existing account instead of a blank draft.
    #[must_use]
    pub fn account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    /// Attaches an account-manager response handle.
    #[must_use]
    pub fn authenticator_response(mut self, response: AuthenticatorResponse) -> Self {
        self.authenticator_response = Some(response);
        self
    }

    /// Allows Exchange autodiscover during checks.
    #[must_use]
    pub fn allow_autodiscover(mut self, allow: bool) -> Self {
        self.allow_autodiscover = allow;
        self
    }

    /// Builds the session.
    #[must_use]
    pub fn build(self) -> SetupSession {
        let mut session = SetupSession::blank();
        session.init(self.flow_mode, self.account);
        session.authenticator_response = self.authenticator_response;
        session.allow_autodiscover = self.allow_autodiscover;
        session
    }
}

impl SetupSession {
    /// Starts building a session in `flow_mode`.
    #[must_use]
    pub const fn builder(flow_mode: FlowMode) -> SetupSessionBuilder {
        SetupSessionBuilder {
            flow_mode,
            account: None,
            authenticator_response: None,
            allow_autodiscover: false,
        }
    }

    /// A session in `flow_mode` with a blank draft account.
    #[must_use]
    pub fn new(flow_mode: FlowMode) -> Self {
        Self::builder(flow_mode).build()
    }

    fn blank() -> Self {
        Self {
            flow_mode: FlowMode::Normal,
            account: Account::new(),
            original: None,
            username: String::new(),
            password: String::new(),
            check_settings_mode: CheckSettingsMode::empty(),
            allow_autodiscover: false,
            policy: None,
            auto_setup: false,
            is_default: false,
            authenticator_response: None,
        }
    }

    /// Resets the session and enters `flow_mode`.
    ///
    /// Adopts `account` if given, otherwise starts from a blank draft. Policy,
    /// credentials, check bits, the autodiscover permission, the
    /// account-manager handle and the auto-setup and default markers are
    /// cleared. In [`FlowMode::Edit`] the adopted account is also kept as the
    /// baseline for [`SetupSession::changed_fields`].
    pub fn init(&mut self, flow_mode: FlowMode, account: Option<Account>) {
        let account = account.unwrap_or_default();
        *self = Self {
            flow_mode,
            original: (flow_mode == FlowMode::Edit).then(|| account.clone()),
            account,
            ..Self::blank()
        };
        debug!("Setup session initialised in {flow_mode:?}");
    }

    /// Current flow mode.
    #[must_use]
    pub const fn flow_mode(&self) -> FlowMode {
        self.flow_mode
    }

    /// Whether an existing account is being edited.
    #[must_use]
    pub fn is_edit(&self) -> bool {
        self.flow_mode == FlowMode::Edit
    }

    /// Account as loaded, when editing.
    #[must_use]
    pub const fn original(&self) -> Option<&Account> {
        self.original.as_ref()
    }

    /// Checks the pipeline must run before saving.
    #[must_use]
    pub const fn check_settings_mode(&self) -> CheckSettingsMode {
        self.check_settings_mode
    }

    /// Records which checks the next pipeline run performs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalFlowState`] when autodiscover is requested but not
    /// allowed in this session.
    pub fn set_check_settings_mode(&mut self, mode: CheckSettingsMode) -> Result<()> {
        if mode.contains(CheckSettingsMode::AUTODISCOVER) && !self.allow_autodiscover {
            return Err(Error::IllegalFlowState(format!(
                "autodiscover requested in {:?} flow without autodiscover",
                self.flow_mode
            )));
        }
        self.check_settings_mode = mode;
        Ok(())
    }

    /// First screen to show for the current mode.
    ///
    /// Account-manager Exchange flows skip the account type choice and get
    /// Exchange server settings created on the draft.
    pub fn initial_step(&mut self) -> SetupStep {
        match self.flow_mode {
            FlowMode::Normal | FlowMode::ForceCreate => SetupStep::Basics,
            FlowMode::AccountManagerPopImap => SetupStep::AccountType,
            FlowMode::AccountManagerEas => {
                self.select_account_type(Protocol::Eas);
                SetupStep::ServerSettings(Protocol::Eas)
            }
            FlowMode::Edit => self
                .account
                .protocol()
                .map_or(SetupStep::AccountType, SetupStep::ServerSettings),
            FlowMode::ReturnToCaller | FlowMode::ReturnToMessageList => SetupStep::Done,
        }
    }

    /// Records the chosen account type on the draft's server settings.
    ///
    /// POP3 and IMAP accounts send through SMTP; Exchange uses one server for
    /// both. Exchange flows may use autodiscover.
    pub fn select_account_type(&mut self, protocol: Protocol) {
        self.account.host_auth_recv_mut(protocol).protocol = protocol;
        self.account.host_auth_send_mut(protocol.outgoing()).protocol = protocol.outgoing();
        if protocol == Protocol::Eas {
            self.allow_autodiscover = true;
        }
        debug!("Account type selected: {protocol}");
    }

    /// Fills both server settings from an expanded catalog provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHostAuthUri`] if the provider's URIs do not parse,
    /// or a validation error if `email` is not an address.
    pub fn apply_provider(
        &mut self,
        provider: &Provider,
        email: &str,
        password: &str,
    ) -> Result<()> {
        if split_email(email).is_none() {
            return Err(Error::Validation(vec![ValidationError::InvalidEmail]));
        }

        let mut recv = HostAuth::from_uri(&provider.incoming_uri)?;
        recv.set_login(&provider.incoming_username, password);
        let mut send = HostAuth::from_uri(&provider.outgoing_uri)?;
        send.set_login(&provider.outgoing_username, password);

        self.set_identity(email, password);
        keep_record_id(&mut recv, self.account.host_auth_recv.as_ref());
        keep_record_id(&mut send, self.account.host_auth_send.as_ref());
        self.account.host_auth_recv = Some(recv);
        self.account.host_auth_send = Some(send);
        self.auto_setup = true;
        debug!("Applied provider {} for {email}", provider.id);
        Ok(())
    }

    /// Fills both server settings with guesses for manual setup.
    ///
    /// Hostnames are inferred from the email domain and connections default
    /// to implicit TLS with the full address as login.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `email` is not an address.
    pub fn apply_manual_defaults(
        &mut self,
        protocol: Protocol,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let email = email.trim();
        let Some((_, domain)) = split_email(email) else {
            return Err(Error::Validation(vec![ValidationError::InvalidEmail]));
        };

        let mut recv = HostAuth::new(protocol);
        recv.address = infer_server_name(domain, ServerRole::Incoming(protocol.host_prefix()));
        recv.flags = HostAuthFlags::SSL;
        recv.port = protocol.default_port(true);
        recv.set_login(email, password);

        let mut send = if protocol == Protocol::Eas {
            recv.clone()
        } else {
            let outgoing = protocol.outgoing();
            let mut send = HostAuth::new(outgoing);
            send.address = infer_server_name(domain, ServerRole::Outgoing(outgoing.host_prefix()));
            send.flags = HostAuthFlags::SSL;
            send.port = outgoing.default_port(true);
            send.set_login(email, password);
            send
        };

        self.set_identity(email, password);
        self.select_account_type(protocol);
        keep_record_id(&mut recv, self.account.host_auth_recv.as_ref());
        keep_record_id(&mut send, self.account.host_auth_send.as_ref());
        self.account.host_auth_recv = Some(recv);
        self.account.host_auth_send = Some(send);
        self.auto_setup = false;
        Ok(())
    }

    fn set_identity(&mut self, email: &str, password: &str) {
        let email = email.trim();
        self.account.email_address = email.to_string();
        if self.account.display_name.is_empty() {
            self.account.display_name = email.to_string();
        }
        self.username = email.to_string();
        self.password = password.to_string();
    }

    /// Fields changed since the account was loaded for editing.
    ///
    /// Every field counts as changed when there is no baseline.
    #[must_use]
    pub fn changed_fields(&self) -> ChangedFields {
        self.original
            .as_ref()
            .map_or(ChangedFields::all(), |original| {
                self.account.changed_fields(original)
            })
    }

    /// Prepares the draft for saving: copies the default marker and policy
    /// onto the account and clears the incomplete flag.
    pub fn finalize_account(&mut self) {
        if self.flow_mode.is_create() {
            self.account.set_default(self.is_default);
        }
        if let Some(policy) = &self.policy {
            self.account.sync_lookback = policy.clamp_lookback(self.account.sync_lookback);
            self.account.policy = Some(policy.clone());
        }
        self.account.flags.remove(AccountFlags::INCOMPLETE);
    }

    /// Leaves the flow, moving to the terminal mode for the current mode.
    pub fn complete(&mut self) -> FlowMode {
        self.flow_mode = self.flow_mode.completion();
        debug!("Setup session completed: {:?}", self.flow_mode);
        self.flow_mode
    }
}

impl Default for SetupSession {
    fn default() -> Self {
        Self::new(FlowMode::Normal)
    }
}

fn keep_record_id(new: &mut HostAuth, old: Option<&HostAuth>) {
    if let Some(old) = old {
        new.id = old.id;
        if new.client_cert_alias.is_none() {
            new.client_cert_alias.clone_from(&old.client_cert_alias);
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
    use crate::account::{AccountId, HostAuthId, SyncWindow};
    use mailsetup_provider::ProviderCatalog;

    #[test]
    fn test_init_normal_twice_gives_fresh_state() {
        let mut session = SetupSession::new(FlowMode::Normal);
        let fresh = session.clone();

        session.account.display_name = "Draft".to_string();
        session.password = "pw".to_string();
        session.is_default = true;
        session.policy = Some(Policy::default());
        session.set_check_settings_mode(CheckSettingsMode::INCOMING).unwrap();
        session.select_account_type(Protocol::Eas);
        session.authenticator_response = Some(AuthenticatorResponse("handle".to_string()));
        assert!(session.allow_autodiscover);

        session.init(FlowMode::Normal, None);
        assert_eq!(session, fresh);
        session.init(FlowMode::Normal, None);
        assert_eq!(session, fresh);
        assert!(session.account.display_name.is_empty());
    }

    #[test]
    fn test_init_revokes_autodiscover() {
        let mut session = SetupSession::new(FlowMode::AccountManagerEas);
        session.initial_step();
        session
            .set_check_settings_mode(CheckSettingsMode::AUTODISCOVER)
            .unwrap();

        session.init(FlowMode::Normal, None);
        assert!(!session.allow_autodiscover);
        assert!(matches!(
            session.set_check_settings_mode(CheckSettingsMode::AUTODISCOVER),
            Err(Error::IllegalFlowState(_))
        ));
    }

    #[test]
    fn test_init_edit_keeps_baseline() {
        let mut account = Account::with_email("jane@example.com");
        account.id = Some(AccountId::new(4));
        let mut session = SetupSession::builder(FlowMode::Edit)
            .account(account.clone())
            .build();
        assert_eq!(session.original(), Some(&account));
        assert!(session.changed_fields().is_empty());

        session.account.sender_name = "Jane".to_string();
        assert_eq!(session.changed_fields(), ChangedFields::SENDER_NAME);
    }

    #[test]
    fn test_changed_fields_without_baseline() {
        let session = SetupSession::new(FlowMode::Normal);
        assert_eq!(session.changed_fields(), ChangedFields::all());
    }

    #[test]
    fn test_initial_steps() {
        assert_eq!(SetupSession::new(FlowMode::Normal).initial_step(), SetupStep::Basics);
        assert_eq!(
            SetupSession::new(FlowMode::ForceCreate).initial_step(),
            SetupStep::Basics
        );
        assert_eq!(
            SetupSession::new(FlowMode::AccountManagerPopImap).initial_step(),
            SetupStep::AccountType
        );
        assert_eq!(
            SetupSession::new(FlowMode::ReturnToCaller).initial_step(),
            SetupStep::Done
        );
    }

    #[test]
    fn test_account_manager_eas_skips_type_selection() {
        let mut session = SetupSession::new(FlowMode::AccountManagerEas);
        assert_eq!(session.initial_step(), SetupStep::ServerSettings(Protocol::Eas));
        assert_eq!(session.account.protocol(), Some(Protocol::Eas));
        assert_eq!(
            session.account.host_auth_send.as_ref().unwrap().protocol,
            Protocol::Eas
        );
        assert!(session.allow_autodiscover);
    }

    #[test]
    fn test_edit_goes_to_server_settings() {
        let mut account = Account::new();
        account.host_auth_recv_mut(Protocol::Pop3);
        let mut session = SetupSession::builder(FlowMode::Edit).account(account).build();
        assert_eq!(session.initial_step(), SetupStep::ServerSettings(Protocol::Pop3));
    }

    #[test]
    fn test_autodiscover_requires_permission() {
        let mut session = SetupSession::new(FlowMode::Normal);
        let err = session
            .set_check_settings_mode(CheckSettingsMode::AUTODISCOVER)
            .unwrap_err();
        assert!(matches!(err, Error::IllegalFlowState(_)));

        let mut session = SetupSession::builder(FlowMode::Normal)
            .allow_autodiscover(true)
            .build();
        session
            .set_check_settings_mode(CheckSettingsMode::AUTODISCOVER)
            .unwrap();
        assert_eq!(session.check_settings_mode(), CheckSettingsMode::AUTODISCOVER);
    }

    #[test]
    fn test_apply_provider() {
        let catalog = ProviderCatalog::layered(None, None);
        let provider = catalog.find_provider_for_email("jane@gmail.com").unwrap();

        let mut session = SetupSession::new(FlowMode::Normal);
        session.apply_provider(&provider, "jane@gmail.com", "pw").unwrap();

        let recv = session.account.host_auth_recv.as_ref().unwrap();
        assert_eq!(recv.protocol, Protocol::Imap);
        assert_eq!(recv.address, "imap.gmail.com");
        assert_eq!(recv.port, 993);
        assert_eq!(recv.login, "jane@gmail.com");
        assert_eq!(recv.password, "pw");
        let send = session.account.host_auth_send.as_ref().unwrap();
        assert_eq!(send.protocol, Protocol::Smtp);
        assert_eq!(send.address, "smtp.gmail.com");
        assert!(session.auto_setup);
        assert_eq!(session.account.email_address, "jane@gmail.com");
    }

    #[test]
    fn test_apply_provider_keeps_record_ids() {
        let catalog = ProviderCatalog::layered(None, None);
        let provider = catalog.find_provider_for_email("jane@gmail.com").unwrap();

        let mut session = SetupSession::new(FlowMode::Normal);
        session.account.host_auth_recv_mut(Protocol::Imap).id = Some(HostAuthId(9));
        session.apply_provider(&provider, "jane@gmail.com", "pw").unwrap();
        assert_eq!(session.account.host_auth_recv.unwrap().id, Some(HostAuthId(9)));
    }

    #[test]
    fn test_apply_manual_defaults_imap() {
        let mut session = SetupSession::new(FlowMode::Normal);
        session
            .apply_manual_defaults(Protocol::Imap, "jane@example.com", "pw")
            .unwrap();

        let recv = session.account.host_auth_recv.as_ref().unwrap();
        assert_eq!(recv.address, "imap.example.com");
        assert_eq!(recv.port, 993);
        assert!(recv.flags.contains(HostAuthFlags::SSL | HostAuthFlags::AUTHENTICATE));
        let send = session.account.host_auth_send.as_ref().unwrap();
        assert_eq!(send.protocol, Protocol::Smtp);
        assert_eq!(send.address, "smtp.example.com");
        assert_eq!(send.port, 465);
        assert!(!session.auto_setup);
    }

    #[test]
    fn test_apply_manual_defaults_eas() {
        let mut session = SetupSession::new(FlowMode::Normal);
        session
            .apply_manual_defaults(Protocol::Eas, "jane@corp.example", "pw")
            .unwrap();
        let recv = session.account.host_auth_recv.clone().unwrap();
        let send = session.account.host_auth_send.clone().unwrap();
        assert_eq!(recv, send);
        assert_eq!(recv.address, "mail.corp.example");
        assert_eq!(recv.port, 443);
    }

    #[test]
    fn test_apply_rejects_bad_email() {
        let mut session = SetupSession::new(FlowMode::Normal);
        assert!(matches!(
            session.apply_manual_defaults(Protocol::Imap, "nope", "pw"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_finalize_account() {
        let mut session = SetupSession::new(FlowMode::Normal);
        session.account.flags.insert(AccountFlags::INCOMPLETE);
        session.account.sync_lookback = SyncWindow::All;
        session.is_default = true;
        session.policy = Some(Policy {
            max_email_lookback: Some(SyncWindow::TwoWeeks),
            ..Default::default()
        });

        session.finalize_account();
        assert!(session.account.is_default());
        assert!(!session.account.flags.contains(AccountFlags::INCOMPLETE));
        assert_eq!(session.account.sync_lookback, SyncWindow::TwoWeeks);
        assert!(session.account.policy.is_some());
    }

    #[test]
    fn test_complete() {
        let mut session = SetupSession::new(FlowMode::Normal);
        assert_eq!(session.complete(), FlowMode::ReturnToMessageList);
        assert!(session.flow_mode().is_terminal());

        let mut session = SetupSession::new(FlowMode::AccountManagerEas);
        assert_eq!(session.complete(), FlowMode::ReturnToCaller);
    }
}
