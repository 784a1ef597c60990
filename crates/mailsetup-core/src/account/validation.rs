//! Account validation.

use super::host_auth::{HostAuth, HostAuthFlags};
use super::model::Account;

/// Which side of the account a [`HostAuth`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSide {
    /// Incoming (receive) server.
    Incoming,
    /// Outgoing (send) server.
    Outgoing,
}

/// Validation error for account configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// Incoming server settings are missing.
    MissingIncoming,
    /// Incoming host is empty.
    EmptyIncomingHost,
    /// Incoming host contains characters not allowed in a hostname.
    InvalidIncomingHost,
    /// Incoming port is invalid.
    InvalidIncomingPort,
    /// Incoming username is empty.
    EmptyIncomingUsername,
    /// Incoming password is empty.
    EmptyIncomingPassword,
    /// Outgoing server settings are missing.
    MissingOutgoing,
    /// Outgoing host is empty.
    EmptyOutgoingHost,
    /// Outgoing host contains characters not allowed in a hostname.
    InvalidOutgoingHost,
    /// Outgoing port is invalid.
    InvalidOutgoingPort,
    /// Outgoing server requires authentication but username is empty.
    EmptyOutgoingUsername,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "Email address is required",
            Self::InvalidEmail => "Invalid email address format",
            Self::MissingIncoming => "Incoming server settings are required",
            Self::EmptyIncomingHost => "Incoming server is required",
            Self::InvalidIncomingHost => "Incoming server name is invalid",
            Self::InvalidIncomingPort => "Incoming port must be 1-65535",
            Self::EmptyIncomingUsername => "Incoming username is required",
            Self::EmptyIncomingPassword => "Incoming password is required",
            Self::MissingOutgoing => "Outgoing server settings are required",
            Self::EmptyOutgoingHost => "Outgoing server is required",
            Self::InvalidOutgoingHost => "Outgoing server name is invalid",
            Self::InvalidOutgoingPort => "Outgoing port must be 1-65535",
            Self::EmptyOutgoingUsername => "Outgoing username is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::MissingIncoming
            | Self::EmptyIncomingHost
            | Self::InvalidIncomingHost => "incoming_host",
            Self::InvalidIncomingPort => "incoming_port",
            Self::EmptyIncomingUsername => "incoming_username",
            Self::EmptyIncomingPassword => "incoming_password",
            Self::MissingOutgoing
            | Self::EmptyOutgoingHost
            | Self::InvalidOutgoingHost => "outgoing_host",
            Self::InvalidOutgoingPort => "outgoing_port",
            Self::EmptyOutgoingUsername => "outgoing_username",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating an account.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate an account configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_account(account: &Account) -> ValidationResult {
    let mut errors = Vec::new();

    if account.email_address.trim().is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(&account.email_address) {
        errors.push(ValidationError::InvalidEmail);
    }

    match &account.host_auth_recv {
        Some(recv) => errors.extend(host_auth_errors(recv, ServerSide::Incoming)),
        None => errors.push(ValidationError::MissingIncoming),
    }
    match &account.host_auth_send {
        Some(send) => errors.extend(host_auth_errors(send, ServerSide::Outgoing)),
        None => errors.push(ValidationError::MissingOutgoing),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one side's server settings.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_host_auth(host_auth: &HostAuth, side: ServerSide) -> ValidationResult {
    let errors = host_auth_errors(host_auth, side);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn host_auth_errors(host_auth: &HostAuth, side: ServerSide) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let address = host_auth.address.trim();

    match side {
        ServerSide::Incoming => {
            if address.is_empty() {
                errors.push(ValidationError::EmptyIncomingHost);
            } else if !is_valid_hostname(address) {
                errors.push(ValidationError::InvalidIncomingHost);
            }
            if host_auth.port == 0 {
                errors.push(ValidationError::InvalidIncomingPort);
            }
            if host_auth.login.trim().is_empty() {
                errors.push(ValidationError::EmptyIncomingUsername);
            }
            if host_auth.password.is_empty() && host_auth.client_cert_alias.is_none() {
                errors.push(ValidationError::EmptyIncomingPassword);
            }
        }
        ServerSide::Outgoing => {
            if address.is_empty() {
                errors.push(ValidationError::EmptyOutgoingHost);
            } else if !is_valid_hostname(address) {
                errors.push(ValidationError::InvalidOutgoingHost);
            }
            if host_auth.port == 0 {
                errors.push(ValidationError::InvalidOutgoingPort);
            }
            if host_auth.flags.contains(HostAuthFlags::AUTHENTICATE)
                && host_auth.login.trim().is_empty()
            {
                errors.push(ValidationError::EmptyOutgoingUsername);
            }
        }
    }

    errors
}

/// Basic email validation.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    // Must contain exactly one @
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() {
        return false;
    }

    // Domain must contain at least one dot and not be empty
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    !domain.split('.').any(str::is_empty)
}

/// Hostnames: dot-separated labels of letters, digits and hyphens.
fn is_valid_hostname(host: &str) -> bool {
    host.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
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
    use crate::account::Protocol;

    fn complete_account() -> Account {
        let mut account = Account::with_email("test@example.com");
        let recv = account.host_auth_recv_mut(Protocol::Imap);
        recv.address = "imap.example.com".to_string();
        recv.port = 993;
        recv.set_login("test@example.com", "secret");
        let send = account.host_auth_send_mut(Protocol::Smtp);
        send.address = "smtp.example.com".to_string();
        send.port = 465;
        send.set_login("test@example.com", "secret");
        account
    }

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user@sub.example.com"));
    }

    #[test]
    fn test_invalid_email() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn test_hostname() {
        assert!(is_valid_hostname("imap.example.com"));
        assert!(is_valid_hostname("mail-1.example.com"));
        assert!(!is_valid_hostname("imap..example.com"));
        assert!(!is_valid_hostname("imap example.com"));
        assert!(!is_valid_hostname("-imap.example.com"));
    }

    #[test]
    fn test_validate_empty_account() {
        let errors = validate_account(&Account::new()).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyEmail));
        assert!(errors.contains(&ValidationError::MissingIncoming));
        assert!(errors.contains(&ValidationError::MissingOutgoing));
    }

    #[test]
    fn test_validate_complete_account() {
        assert!(validate_account(&complete_account()).is_ok());
    }

    #[test]
    fn test_outgoing_without_auth_needs_no_login() {
        let mut account = complete_account();
        account
            .host_auth_send_mut(Protocol::Smtp)
            .set_login("", "");
        assert!(validate_account(&account).is_ok());
    }

    #[test]
    fn test_validate_host_auth_incoming() {
        let mut recv = HostAuth::new(Protocol::Pop3);
        recv.address = "pop.exa mple.com".to_string();
        let errors = validate_host_auth(&recv, ServerSide::Incoming).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidIncomingHost,
                ValidationError::InvalidIncomingPort,
                ValidationError::EmptyIncomingUsername,
                ValidationError::EmptyIncomingPassword,
            ]
        );
        assert_eq!(errors[0].field(), "incoming_host");
    }

    #[test]
    fn test_client_cert_replaces_password() {
        let mut account = complete_account();
        let recv = account.host_auth_recv_mut(Protocol::Imap);
        recv.password.clear();
        recv.client_cert_alias = Some("corp-cert".to_string());
        assert!(validate_account(&account).is_ok());
    }
}
