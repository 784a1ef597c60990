//! Error types for the core library.

use thiserror::Error;

use crate::account::ValidationError;
use crate::pipeline::CheckErrorReason;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Another account already uses the same server and login.
    #[error("Duplicate account: {account_name} already uses this server and login")]
    DuplicateAccount {
        /// Display name of the existing account.
        account_name: String,
    },

    /// The server presented a certificate the user has to accept.
    #[error("Server {host} requires a security decision")]
    ConnectivitySecurityRequired {
        /// Server that raised the prompt.
        host: String,
    },

    /// The connectivity check failed.
    #[error("Connection check failed ({reason}): {message}")]
    ConnectivityError {
        /// Failure category.
        reason: CheckErrorReason,
        /// Message from the checker.
        message: String,
    },

    /// A flow step was invoked in a state that does not allow it.
    #[error("Illegal flow state: {0}")]
    IllegalFlowState(String),

    /// Fields failed validation.
    #[error("Validation failed: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    /// The pipeline was cancelled before finishing.
    #[error("Operation cancelled")]
    Cancelled,

    /// A host-auth URI could not be parsed.
    #[error("Invalid server URI: {0}")]
    InvalidHostAuthUri(String),

    /// A saved session bundle could not be restored.
    #[error("Session bundle error: {0}")]
    Bundle(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Provider catalog error.
    #[error("Provider error: {0}")]
    Provider(#[from] mailsetup_provider::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::account::credentials::CredentialError),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
