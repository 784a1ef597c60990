//! Secure credential storage using system keyring.
//!
//! Server passwords are stored per host-auth record in the platform's
//! native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::{debug, warn};

use super::HostAuthId;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailsetup";

/// Credential type identifier for server passwords.
const PASSWORD_CREDENTIAL: &str = "hostauth";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Host-auth ID is required for credential operations.
    #[error("Host-auth ID is required for credential storage")]
    MissingHostAuthId,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Generates the keyring entry key for a host-auth record.
fn credential_key(host_auth_id: HostAuthId) -> String {
    format!("{SERVICE_NAME}_{PASSWORD_CREDENTIAL}_{}", host_auth_id.0)
}

/// Stores a server password securely in the system keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn store_password(host_auth_id: HostAuthId, password: &str) -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, &credential_key(host_auth_id))?;
    entry.set_password(password)?;
    debug!("Stored password for host auth {}", host_auth_id.0);
    Ok(())
}

/// Retrieves a server password from the system keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn get_password(host_auth_id: HostAuthId) -> CredentialResult<Option<String>> {
    let entry = Entry::new(SERVICE_NAME, &credential_key(host_auth_id))?;
    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            debug!("No password found for host auth {}", host_auth_id.0);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes a server password from the keyring.
///
/// A missing entry is not an error.
///
/// # Errors
///
/// Returns an error if the keyring operation fails (except for missing entries).
pub fn delete_password(host_auth_id: HostAuthId) -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, &credential_key(host_auth_id))?;
    match entry.delete_credential() {
        Ok(()) => {
            debug!("Deleted password for host auth {}", host_auth_id.0);
            Ok(())
        }
        Err(keyring::Error::NoEntry) => {
            debug!("No password to delete for host auth {}", host_auth_id.0);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to delete password: {e}");
            Err(e.into())
        }
    }
}

/// Stores the password of a saved host-auth record.
///
/// # Errors
///
/// Returns an error if the record has no ID or the keyring operation fails.
pub fn store_host_auth_password(
    host_auth_id: Option<HostAuthId>,
    password: &str,
) -> CredentialResult<()> {
    let id = host_auth_id.ok_or(CredentialError::MissingHostAuthId)?;
    store_password(id, password)
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
    // Note: These tests interact with the actual system keyring.
    // They are marked as ignored by default to avoid polluting the keyring
    // during automated testing. Run manually with `cargo test -- --ignored`

    use super::*;

    #[test]
    fn test_credential_key() {
        assert_eq!(credential_key(HostAuthId(12)), "mailsetup_hostauth_12");
    }

    #[test]
    fn test_missing_id() {
        assert!(matches!(
            store_host_auth_password(None, "pw"),
            Err(CredentialError::MissingHostAuthId)
        ));
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_password() {
        let id = HostAuthId(99999); // Use high ID to avoid conflicts
        store_password(id, "test_password_12345").unwrap();
        assert_eq!(
            get_password(id).unwrap(),
            Some("test_password_12345".to_string())
        );
        delete_password(id).unwrap();
        assert_eq!(get_password(id).unwrap(), None);
    }
}
