//! Server-imposed security policy.

use serde::{Deserialize, Serialize};

use super::model::SyncWindow;

/// Password requirement imposed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordMode {
    /// No device password required.
    #[default]
    None,
    /// Simple PIN or password.
    Simple,
    /// Alphanumeric password.
    Strong,
}

/// Security policy sent by an Exchange server during setup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Device password requirement.
    pub password_mode: PasswordMode,
    /// Minimum password length.
    pub password_min_length: u32,
    /// Failed attempts before wipe (0 = unlimited).
    pub password_max_fails: u32,
    /// Days until password expires (0 = never).
    pub password_expiration_days: u32,
    /// Number of previous passwords that cannot be reused.
    pub password_history: u32,
    /// Maximum idle seconds before the screen locks (0 = no limit).
    pub max_screen_lock_time: u32,
    /// Whether the server may remotely wipe the device.
    pub require_remote_wipe: bool,
    /// Whether device storage must be encrypted.
    pub require_encryption: bool,
    /// Whether sync must be manual while roaming.
    pub require_manual_sync_when_roaming: bool,
    /// Whether attachments are blocked.
    pub dont_allow_attachments: bool,
    /// Maximum attachment size in bytes (0 = no limit).
    pub max_attachment_size: u32,
    /// Largest sync window the server allows.
    pub max_email_lookback: Option<SyncWindow>,
    /// Policies the server requires that this client cannot enforce.
    pub unsupported_policies: Vec<String>,
}

impl Policy {
    /// Whether every required policy can be enforced.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.unsupported_policies.is_empty()
    }

    /// Narrows a requested sync window to what this policy allows.
    #[must_use]
    pub fn clamp_lookback(&self, requested: SyncWindow) -> SyncWindow {
        match self.max_email_lookback {
            Some(max) if requested > max => max,
            _ => requested,
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

    #[test]
    fn test_default_is_supported() {
        let policy = Policy::default();
        assert!(policy.is_supported());
        assert_eq!(policy.password_mode, PasswordMode::None);
    }

    #[test]
    fn test_unsupported() {
        let policy = Policy {
            unsupported_policies: vec!["RequireSignedSMIMEMessages".to_string()],
            ..Default::default()
        };
        assert!(!policy.is_supported());
    }

    #[test]
    fn test_clamp_lookback() {
        let policy = Policy {
            max_email_lookback: Some(SyncWindow::OneWeek),
            ..Default::default()
        };
        assert_eq!(policy.clamp_lookback(SyncWindow::All), SyncWindow::OneWeek);
        assert_eq!(policy.clamp_lookback(SyncWindow::ThreeDays), SyncWindow::ThreeDays);
        assert_eq!(
            Policy::default().clamp_lookback(SyncWindow::All),
            SyncWindow::All
        );
    }
}
