//! # mailsetup-core
//!
//! Account setup logic for mail clients.
//!
//! This crate provides:
//! - Account, server settings and policy models
//! - Account validation
//! - **Setup session** - caller-owned flow state with a versioned save format
//! - **Setup pipeline** - duplicate check, connectivity check and save, one run at a time
//! - **Account store** - `SQLite` storage with passwords in the system keyring
//! - Host UI prompts and the server settings screen logic

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod error;
pub mod pipeline;
pub mod setup;

pub use account::credentials;
pub use account::{
    Account, AccountBackup, AccountFlags, AccountId, ChangedFields, CredentialVault, HostAuth,
    HostAuthFlags, HostAuthId, PasswordMode, Policy, Protocol, ServerSide, SqliteAccountStore,
    SyncWindow,
};
pub use account::{
    CredentialError, CredentialResult, ValidationError, ValidationResult, validate_account,
    validate_host_auth,
};
pub use error::{Error, Result};
pub use pipeline::{
    AccountStore, CheckErrorReason, CheckResult, CheckSettingsSink, ConnectivityChecker,
    DuplicateCheckSink, PipelineHandle, PipelineOutcome, ProceedRequest, SaveSink, SetupPipeline,
    Sinks,
};
pub use setup::{
    BackAction, CheckSettingsMode, FlowMode, Prompt, PromptAction, PromptChoice,
    ServerSettingsEditor, SetupSession, SetupStep,
};
