//! Account management module.
//!
//! Provides the account draft model, server settings, validation and storage.

pub mod credentials;
mod host_auth;
mod model;
mod policy;
mod repository;
mod validation;

pub use credentials::{CredentialError, CredentialResult};
pub use host_auth::{HostAuth, HostAuthFlags, HostAuthId, Protocol};
pub use model::{Account, AccountFlags, AccountId, ChangedFields, SyncWindow};
pub use policy::{PasswordMode, Policy};
pub use repository::{AccountBackup, CredentialVault, SqliteAccountStore};
pub use validation::{
    ServerSide, ValidationError, ValidationResult, validate_account, validate_host_auth,
};
