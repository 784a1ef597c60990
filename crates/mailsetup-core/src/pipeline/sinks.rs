//! Per-stage result sinks for the host UI.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::checker::CheckResult;
use crate::Error;
use crate::account::Account;

/// Receives the duplicate-check result.
pub trait DuplicateCheckSink: Send + Sync {
    /// Called once stage one finishes; `existing` is the clashing account.
    fn on_duplicate_check(&self, existing: Option<&Account>) {
        let _ = existing;
    }
}

/// Receives the connectivity-check result.
pub trait CheckSettingsSink: Send + Sync {
    /// Called once the checker answers.
    fn on_check_settings(&self, result: &CheckResult) {
        let _ = result;
    }
}

/// Receives the save result.
pub trait SaveSink: Send + Sync {
    /// Called after the account is committed.
    fn on_saved(&self, account: &Account) {
        let _ = account;
    }

    /// Called when the commit fails; nothing was written.
    fn on_save_failed(&self, error: &Error) {
        let _ = error;
    }
}

/// Sinks attached to one pipeline run. Unset sinks are skipped.
#[derive(Clone, Default)]
pub struct Sinks {
    duplicate: Option<Arc<dyn DuplicateCheckSink>>,
    check: Option<Arc<dyn CheckSettingsSink>>,
    save: Option<Arc<dyn SaveSink>>,
}

impl Sinks {
    /// No sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duplicate-check sink.
    #[must_use]
    pub fn duplicate(mut self, sink: Arc<dyn DuplicateCheckSink>) -> Self {
        self.duplicate = Some(sink);
        self
    }

    /// Sets the connectivity-check sink.
    #[must_use]
    pub fn check_settings(mut self, sink: Arc<dyn CheckSettingsSink>) -> Self {
        self.check = Some(sink);
        self
    }

    /// Sets the save sink.
    #[must_use]
    pub fn save(mut self, sink: Arc<dyn SaveSink>) -> Self {
        self.save = Some(sink);
        self
    }

    pub(super) fn bind(self, disposed: Arc<AtomicBool>) -> BoundSinks {
        BoundSinks {
            sinks: self,
            disposed,
        }
    }
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks")
            .field("duplicate", &self.duplicate.is_some())
            .field("check", &self.check.is_some())
            .field("save", &self.save.is_some())
            .finish()
    }
}

/// Sinks tied to a run; silent once the run is cancelled.
pub(super) struct BoundSinks {
    sinks: Sinks,
    disposed: Arc<AtomicBool>,
}

impl BoundSinks {
    fn live(&self) -> bool {
        !self.disposed.load(Ordering::Acquire)
    }

    pub(super) fn duplicate_checked(&self, existing: Option<&Account>) {
        if let Some(sink) = self.sinks.duplicate.as_ref().filter(|_| self.live()) {
            sink.on_duplicate_check(existing);
        }
    }

    pub(super) fn settings_checked(&self, result: &CheckResult) {
        if let Some(sink) = self.sinks.check.as_ref().filter(|_| self.live()) {
            sink.on_check_settings(result);
        }
    }

    pub(super) fn saved(&self, account: &Account) {
        if let Some(sink) = self.sinks.save.as_ref().filter(|_| self.live()) {
            sink.on_saved(account);
        }
    }

    pub(super) fn save_failed(&self, error: &Error) {
        if let Some(sink) = self.sinks.save.as_ref().filter(|_| self.live()) {
            sink.on_save_failed(error);
        }
    }
}
