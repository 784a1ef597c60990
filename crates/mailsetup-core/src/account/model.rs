//! Account model types.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::host_auth::{HostAuth, Protocol};
use super::policy::Policy;

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Per-account behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccountFlags: u32 {
        /// Notify when new mail arrives.
        const NOTIFY_NEW_MAIL = 1;
        /// Always vibrate on notification.
        const VIBRATE_ALWAYS = 1 << 1;
        /// Vibrate only when the ringer is silent.
        const VIBRATE_WHEN_SILENT = 1 << 2;
        /// This is the default sending account.
        const DEFAULT = 1 << 3;
        /// Setup has not finished yet.
        const INCOMPLETE = 1 << 4;
        /// Sync is held until the security policy is accepted.
        const SECURITY_HOLD = 1 << 5;
    }
}

/// How far back mail is synchronised.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SyncWindow {
    /// Let the server decide.
    #[default]
    Auto,
    /// One day.
    OneDay,
    /// Three days.
    ThreeDays,
    /// One week.
    OneWeek,
    /// Two weeks.
    TwoWeeks,
    /// One month.
    OneMonth,
    /// Everything.
    All,
}

impl SyncWindow {
    /// Number of days covered, or `None` for [`Auto`](Self::Auto) and [`All`](Self::All).
    #[must_use]
    pub const fn days(&self) -> Option<u32> {
        match self {
            Self::Auto | Self::All => None,
            Self::OneDay => Some(1),
            Self::ThreeDays => Some(3),
            Self::OneWeek => Some(7),
            Self::TwoWeeks => Some(14),
            Self::OneMonth => Some(30),
        }
    }
}

bitflags! {
    /// Which account fields differ between two versions of an account.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangedFields: u32 {
        /// Display name.
        const DISPLAY_NAME = 1;
        /// Email address.
        const EMAIL_ADDRESS = 1 << 1;
        /// Sender name.
        const SENDER_NAME = 1 << 2;
        /// Signature.
        const SIGNATURE = 1 << 3;
        /// Flags.
        const FLAGS = 1 << 4;
        /// Sync interval.
        const SYNC_INTERVAL = 1 << 5;
        /// Sync lookback window.
        const SYNC_LOOKBACK = 1 << 6;
        /// Incoming server settings.
        const INCOMING = 1 << 7;
        /// Outgoing server settings.
        const OUTGOING = 1 << 8;
        /// Security policy.
        const POLICY = 1 << 9;
    }
}

/// Email account configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (None for unsaved accounts).
    pub id: Option<AccountId>,
    /// Display name for the account.
    pub display_name: String,
    /// Email address.
    pub email_address: String,
    /// Name shown to recipients.
    pub sender_name: String,
    /// Signature appended to outgoing mail.
    pub signature: String,
    /// Behaviour flags.
    pub flags: AccountFlags,
    /// Minutes between syncs, or one of the `CHECK_INTERVAL_*` constants.
    pub sync_interval: i32,
    /// How far back mail is synchronised.
    pub sync_lookback: SyncWindow,
    /// Exchange security sync key.
    pub security_sync_key: Option<String>,
    /// Incoming server settings.
    pub host_auth_recv: Option<HostAuth>,
    /// Outgoing server settings.
    pub host_auth_send: Option<HostAuth>,
    /// Security policy imposed by the server.
    pub policy: Option<Policy>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            id: None,
            display_name: String::new(),
            email_address: String::new(),
            sender_name: String::new(),
            signature: String::new(),
            flags: AccountFlags::NOTIFY_NEW_MAIL,
            sync_interval: Self::DEFAULT_SYNC_INTERVAL,
            sync_lookback: SyncWindow::Auto,
            security_sync_key: None,
            host_auth_recv: None,
            host_auth_send: None,
            policy: None,
        }
    }
}

impl Account {
    /// Never check automatically.
    pub const CHECK_INTERVAL_NEVER: i32 = -1;
    /// Server pushes new mail.
    pub const CHECK_INTERVAL_PUSH: i32 = -2;
    /// Minutes between checks for new accounts.
    pub const DEFAULT_SYNC_INTERVAL: i32 = 15;

    /// Create a new empty account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account for an email address, named after the address.
    #[must_use]
    pub fn with_email(email: &str) -> Self {
        let email = email.trim();
        Self {
            display_name: email.to_string(),
            email_address: email.to_string(),
            ..Self::default()
        }
    }

    /// Incoming settings, created for `protocol` if absent.
    pub fn host_auth_recv_mut(&mut self, protocol: Protocol) -> &mut HostAuth {
        self.host_auth_recv
            .get_or_insert_with(|| HostAuth::new(protocol))
    }

    /// Outgoing settings, created for `protocol` if absent.
    pub fn host_auth_send_mut(&mut self, protocol: Protocol) -> &mut HostAuth {
        self.host_auth_send
            .get_or_insert_with(|| HostAuth::new(protocol))
    }

    /// Incoming protocol, if chosen.
    #[must_use]
    pub fn protocol(&self) -> Option<Protocol> {
        self.host_auth_recv.as_ref().map(|ha| ha.protocol)
    }

    /// Whether this is the default account.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.flags.contains(AccountFlags::DEFAULT)
    }

    /// Marks or unmarks this as the default account.
    pub fn set_default(&mut self, is_default: bool) {
        self.flags.set(AccountFlags::DEFAULT, is_default);
    }

    /// Lists the fields that differ from `original`.
    ///
    /// Host-auth record ids are ignored; only connection settings count.
    #[must_use]
    pub fn changed_fields(&self, original: &Self) -> ChangedFields {
        let mut changed = ChangedFields::empty();
        changed.set(
            ChangedFields::DISPLAY_NAME,
            self.display_name != original.display_name,
        );
        changed.set(
            ChangedFields::EMAIL_ADDRESS,
            self.email_address != original.email_address,
        );
        changed.set(
            ChangedFields::SENDER_NAME,
            self.sender_name != original.sender_name,
        );
        changed.set(ChangedFields::SIGNATURE, self.signature != original.signature);
        changed.set(ChangedFields::FLAGS, self.flags != original.flags);
        changed.set(
            ChangedFields::SYNC_INTERVAL,
            self.sync_interval != original.sync_interval,
        );
        changed.set(
            ChangedFields::SYNC_LOOKBACK,
            self.sync_lookback != original.sync_lookback,
        );
        changed.set(
            ChangedFields::INCOMING,
            !same_host_auth(self.host_auth_recv.as_ref(), original.host_auth_recv.as_ref()),
        );
        changed.set(
            ChangedFields::OUTGOING,
            !same_host_auth(self.host_auth_send.as_ref(), original.host_auth_send.as_ref()),
        );
        changed.set(ChangedFields::POLICY, self.policy != original.policy);
        changed
    }
}

fn same_host_auth(a: Option<&HostAuth>, b: Option<&HostAuth>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_settings(b),
        (None, None) => true,
        _ => false,
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
    use crate::account::HostAuthId;

    mod account_id_tests {
        use super::*;

        #[test]
        fn new() {
            let id = AccountId::new(42);
            assert_eq!(id.0, 42);
        }

        #[test]
        fn display() {
            let id = AccountId::new(123);
            assert_eq!(format!("{id}"), "123");
        }
    }

    mod sync_window_tests {
        use super::*;

        #[test]
        fn days() {
            assert_eq!(SyncWindow::OneWeek.days(), Some(7));
            assert_eq!(SyncWindow::All.days(), None);
            assert_eq!(SyncWindow::Auto.days(), None);
        }

        #[test]
        fn ordering() {
            assert!(SyncWindow::OneDay < SyncWindow::OneMonth);
            assert!(SyncWindow::OneMonth < SyncWindow::All);
        }
    }

    mod account_tests {
        use super::*;

        #[test]
        fn new_creates_blank_draft() {
            let account = Account::new();
            assert!(account.id.is_none());
            assert!(account.display_name.is_empty());
            assert!(account.host_auth_recv.is_none());
            assert!(!account.is_default());
            assert!(account.flags.contains(AccountFlags::NOTIFY_NEW_MAIL));
            assert_eq!(account.sync_interval, Account::DEFAULT_SYNC_INTERVAL);
        }

        #[test]
        fn with_email() {
            let account = Account::with_email(" jane@example.com ");
            assert_eq!(account.email_address, "jane@example.com");
            assert_eq!(account.display_name, "jane@example.com");
        }

        #[test]
        fn get_or_create_host_auth() {
            let mut account = Account::new();
            account.host_auth_recv_mut(Protocol::Pop3).address = "pop.example.com".to_string();
            // Existing record is kept even if a different protocol is asked for.
            assert_eq!(account.host_auth_recv_mut(Protocol::Imap).protocol, Protocol::Pop3);
            assert_eq!(account.protocol(), Some(Protocol::Pop3));
        }

        #[test]
        fn default_flag() {
            let mut account = Account::new();
            account.set_default(true);
            assert!(account.is_default());
            account.set_default(false);
            assert!(!account.is_default());
        }

        #[test]
        fn changed_fields_none() {
            let account = Account::with_email("jane@example.com");
            assert!(account.changed_fields(&account.clone()).is_empty());
        }

        #[test]
        fn changed_fields_detects_edits() {
            let mut original = Account::with_email("jane@example.com");
            original.host_auth_recv_mut(Protocol::Imap).address = "imap.example.com".to_string();
            let mut edited = original.clone();
            edited.signature = "-- Jane".to_string();
            edited.sync_interval = Account::CHECK_INTERVAL_PUSH;
            edited.host_auth_recv_mut(Protocol::Imap).port = 1993;

            let changed = edited.changed_fields(&original);
            assert_eq!(
                changed,
                ChangedFields::SIGNATURE | ChangedFields::SYNC_INTERVAL | ChangedFields::INCOMING
            );
        }

        #[test]
        fn changed_fields_ignores_record_ids() {
            let mut original = Account::new();
            original.host_auth_send_mut(Protocol::Smtp).address = "smtp.example.com".to_string();
            let mut saved = original.clone();
            saved.host_auth_send_mut(Protocol::Smtp).id = Some(HostAuthId(3));
            assert!(saved.changed_fields(&original).is_empty());
        }
    }
}
