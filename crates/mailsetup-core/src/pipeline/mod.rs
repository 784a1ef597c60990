//! Duplicate-check, connectivity-check and save pipeline.
//!
//! A run goes through three stages, each starting only after the previous one
//! succeeded:
//!
//! 1. look for another account with the same incoming host and login;
//! 2. ask the [`ConnectivityChecker`] to try the settings;
//! 3. commit the account through the [`AccountStore`].
//!
//! Nothing is written unless stage three runs. Runs execute on the tokio
//! runtime and work on a snapshot taken from the session, so the session stays
//! with the caller.

mod checker;
mod sinks;
mod store;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use checker::{CheckErrorReason, CheckResult, ConnectivityChecker};
pub use sinks::{CheckSettingsSink, DuplicateCheckSink, SaveSink, Sinks};
pub use store::AccountStore;

use crate::account::{Account, AccountId, ChangedFields, HostAuth};
use crate::setup::{CheckSettingsMode, FlowMode, SetupSession};
use crate::{Error, Result};
use sinks::BoundSinks;

/// Snapshot of the session fields one pipeline run needs.
#[derive(Debug, Clone)]
pub struct ProceedRequest {
    /// Account excluded from the duplicate check (the one being edited).
    pub account_id: Option<AccountId>,
    /// Incoming host to check for duplicates.
    pub check_host: String,
    /// Incoming login to check for duplicates.
    pub check_login: String,
    /// Checks to run in stage two; empty skips the stage.
    pub check_mode: CheckSettingsMode,
    /// Flow mode; [`FlowMode::Edit`] updates instead of inserting.
    pub flow_mode: FlowMode,
    /// Whether an autodiscover check may be requested.
    pub allow_autodiscover: bool,
    /// Account to commit.
    pub account: Account,
    /// Fields to write when editing.
    pub changed: ChangedFields,
}

impl ProceedRequest {
    /// Snapshots `session` for a run performing `check_mode`.
    ///
    /// The account is taken as [`SetupSession::finalize_account`] would leave it.
    #[must_use]
    pub fn from_session(session: &SetupSession, check_mode: CheckSettingsMode) -> Self {
        let mut draft = session.clone();
        draft.finalize_account();
        let (check_host, check_login) = draft
            .account
            .host_auth_recv
            .as_ref()
            .map(|ha| (ha.address.clone(), ha.login.clone()))
            .unwrap_or_default();

        Self {
            account_id: draft.account.id,
            check_host,
            check_login,
            check_mode,
            flow_mode: draft.flow_mode(),
            allow_autodiscover: draft.allow_autodiscover,
            changed: draft.changed_fields(),
            account: draft.account,
        }
    }
}

/// Successful end of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The account was committed; ids are filled in for new accounts.
    Saved(Account),
    /// Autodiscover answered; nothing was saved.
    AutoDiscovered {
        /// Result code reported by autodiscover.
        code: i32,
        /// Discovered server settings, if any.
        host_auth: Option<HostAuth>,
    },
}

/// Runs the setup pipeline, one run at a time.
#[derive(Clone)]
pub struct SetupPipeline {
    store: Arc<dyn AccountStore>,
    checker: Arc<dyn ConnectivityChecker>,
    in_flight: Arc<AtomicBool>,
}

impl SetupPipeline {
    /// Creates a pipeline over `store` and `checker`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, checker: Arc<dyn ConnectivityChecker>) -> Self {
        Self {
            store,
            checker,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Starts a run on the current tokio runtime.
    ///
    /// Returns `None` without doing anything while another run is in flight.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn proceed(&self, request: ProceedRequest, sinks: Sinks) -> Option<PipelineHandle> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Pipeline busy, ignoring proceed");
            return None;
        }

        let disposed = Arc::new(AtomicBool::new(false));
        let run = Run {
            store: Arc::clone(&self.store),
            checker: Arc::clone(&self.checker),
            sinks: sinks.bind(Arc::clone(&disposed)),
        };
        let guard = InFlight(Arc::clone(&self.in_flight));
        let task = tokio::spawn(async move {
            let _guard = guard;
            run.execute(request).await
        });

        Some(PipelineHandle { task, disposed })
    }
}

impl std::fmt::Debug for SetupPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupPipeline")
            .field("in_flight", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when a run ends or is dropped.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    task: JoinHandle<Result<PipelineOutcome>>,
    disposed: Arc<AtomicBool>,
}

impl PipelineHandle {
    /// Abandons the run. Pending work is dropped and no sink is called again.
    pub fn cancel(&self) {
        self.disposed.store(true, Ordering::Release);
        self.task.abort();
    }

    /// Whether the run has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to end.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the run, or [`Error::Cancelled`] if
    /// [`PipelineHandle::cancel`] stopped it first. A run that had already
    /// finished keeps its outcome.
    pub async fn outcome(self) -> Result<PipelineOutcome> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

struct Run {
    store: Arc<dyn AccountStore>,
    checker: Arc<dyn ConnectivityChecker>,
    sinks: BoundSinks,
}

impl Run {
    async fn execute(self, request: ProceedRequest) -> Result<PipelineOutcome> {
        let ProceedRequest {
            account_id,
            check_host,
            check_login,
            check_mode,
            flow_mode,
            allow_autodiscover,
            mut account,
            changed,
        } = request;

        let existing = self
            .store
            .find_existing_account(account_id, &check_host, &check_login)
            .await?;
        self.sinks.duplicate_checked(existing.as_ref());
        if let Some(existing) = existing {
            info!("Duplicate account for {check_login}@{check_host}");
            return Err(Error::DuplicateAccount {
                account_name: existing.display_name,
            });
        }

        if !check_mode.is_empty() {
            if check_mode.contains(CheckSettingsMode::AUTODISCOVER) && !allow_autodiscover {
                return Err(Error::IllegalFlowState(format!(
                    "autodiscover requested in {flow_mode:?} flow"
                )));
            }

            let result = self.checker.check(check_mode, &account).await;
            self.sinks.settings_checked(&result);
            match result {
                CheckResult::Ok { policy } => {
                    if let Some(policy) = policy {
                        account.sync_lookback = policy.clamp_lookback(account.sync_lookback);
                        account.policy = Some(policy);
                    }
                }
                CheckResult::SecurityRequired { host } => {
                    return Err(Error::ConnectivitySecurityRequired { host });
                }
                CheckResult::Error { reason, message } => {
                    warn!("Settings check failed: {reason}: {message}");
                    return Err(Error::ConnectivityError { reason, message });
                }
                CheckResult::AutoDiscover { code, host_auth } => {
                    if !check_mode.contains(CheckSettingsMode::AUTODISCOVER) {
                        return Err(Error::IllegalFlowState(format!(
                            "autodiscover result for {check_mode:?} check"
                        )));
                    }
                    return Ok(PipelineOutcome::AutoDiscovered { code, host_auth });
                }
            }
        }

        let saved = if flow_mode == FlowMode::Edit {
            self.save_after_edit(&mut account, changed).await
        } else {
            self.save_after_setup(&mut account).await
        };

        match saved {
            Ok(()) => {
                self.sinks.saved(&account);
                Ok(PipelineOutcome::Saved(account))
            }
            Err(e) => {
                warn!("Saving account failed: {e}");
                self.sinks.save_failed(&e);
                Err(e)
            }
        }
    }

    async fn save_after_setup(&self, account: &mut Account) -> Result<()> {
        self.store.save_account(account).await?;
        info!("Saved new account {}", account.email_address);
        Ok(())
    }

    async fn save_after_edit(&self, account: &mut Account, changed: ChangedFields) -> Result<()> {
        self.store.update_account(account, changed).await?;
        self.store.backup().await?;
        info!("Updated account {} ({changed:?})", account.email_address);
        Ok(())
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
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::account::{Policy, Protocol, SyncWindow};

    #[derive(Default)]
    struct MockStore {
        accounts: Mutex<Vec<Account>>,
        finds: AtomicUsize,
        saves: AtomicUsize,
        updates: AtomicUsize,
        backups: AtomicUsize,
        fail_save: bool,
    }

    #[async_trait]
    impl AccountStore for MockStore {
        async fn find_existing_account(
            &self,
            exclude: Option<AccountId>,
            host: &str,
            login: &str,
        ) -> Result<Option<Account>> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            let accounts = self.accounts.lock().unwrap();
            Ok(accounts
                .iter()
                .filter(|a| exclude.is_none() || a.id != exclude)
                .find(|a| {
                    a.host_auth_recv
                        .as_ref()
                        .is_some_and(|ha| {
                            ha.address.eq_ignore_ascii_case(host) && ha.login == login
                        })
                })
                .cloned())
        }

        async fn save_account(&self, account: &mut Account) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(Error::AccountNotFound("disk full".to_string()));
            }
            let mut accounts = self.accounts.lock().unwrap();
            account.id = Some(AccountId::new(accounts.len() as i64 + 1));
            accounts.push(account.clone());
            Ok(())
        }

        async fn update_account(
            &self,
            _account: &mut Account,
            _changed: ChangedFields,
        ) -> Result<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn backup(&self) -> Result<()> {
            self.backups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct MockChecker {
        result: CheckResult,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl MockChecker {
        fn returning(result: CheckResult) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn ok() -> Self {
            Self::returning(CheckResult::Ok { policy: None })
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl ConnectivityChecker for MockChecker {
        async fn check(&self, _mode: CheckSettingsMode, _account: &Account) -> CheckResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct CountingSinks {
        duplicates: AtomicUsize,
        checks: AtomicUsize,
        saved: AtomicUsize,
        failed: AtomicUsize,
    }

    impl DuplicateCheckSink for CountingSinks {
        fn on_duplicate_check(&self, existing: Option<&Account>) {
            if existing.is_some() {
                self.duplicates.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl CheckSettingsSink for CountingSinks {
        fn on_check_settings(&self, _result: &CheckResult) {
            self.checks.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl SaveSink for CountingSinks {
        fn on_saved(&self, _account: &Account) {
            self.saved.fetch_add(1, Ordering::SeqCst);
        }

        fn on_save_failed(&self, _error: &Error) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sinks(counting: &Arc<CountingSinks>) -> Sinks {
        Sinks::new()
            .duplicate(counting.clone())
            .check_settings(counting.clone())
            .save(counting.clone())
    }

    fn stored_account(id: i64, host: &str, login: &str) -> Account {
        let mut account = Account::with_email(&format!("{login}@example.com"));
        account.id = Some(AccountId::new(id));
        let recv = account.host_auth_recv_mut(Protocol::Imap);
        recv.address = host.to_string();
        recv.login = login.to_string();
        account
    }

    fn request(flow_mode: FlowMode, host: &str, login: &str) -> ProceedRequest {
        let mut session = SetupSession::new(flow_mode);
        session
            .apply_manual_defaults(Protocol::Imap, &format!("{login}@example.com"), "pw")
            .unwrap();
        let recv = session.account.host_auth_recv.as_mut().unwrap();
        recv.address = host.to_string();
        recv.login = login.to_string();
        ProceedRequest::from_session(
            &session,
            CheckSettingsMode::INCOMING | CheckSettingsMode::OUTGOING,
        )
    }

    #[tokio::test]
    async fn test_duplicate_never_checks_settings() {
        let store = Arc::new(MockStore::default());
        store
            .accounts
            .lock()
            .unwrap()
            .push(stored_account(1, "imap.example.com", "jane"));
        let checker = Arc::new(MockChecker::ok());
        let counting = Arc::new(CountingSinks::default());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let mut req = request(FlowMode::Normal, "IMAP.example.com", "jane");
        req.account_id = Some(AccountId::new(2));
        let err = pipeline
            .proceed(req, sinks(&counting))
            .unwrap()
            .outcome()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateAccount { .. }));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        assert_eq!(counting.duplicates.load(Ordering::SeqCst), 1);
        assert_eq!(counting.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_own_account_is_not_a_duplicate() {
        let store = Arc::new(MockStore::default());
        let mut existing = stored_account(1, "imap.example.com", "jane");
        store.accounts.lock().unwrap().push(existing.clone());
        let checker = Arc::new(MockChecker::ok());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        existing.sender_name = "Jane".to_string();
        let mut session = SetupSession::builder(FlowMode::Edit)
            .account(stored_account(1, "imap.example.com", "jane"))
            .build();
        session.account = existing;
        let req = ProceedRequest::from_session(&session, CheckSettingsMode::INCOMING);
        assert_eq!(req.changed, ChangedFields::SENDER_NAME);

        let outcome = pipeline.proceed(req, Sinks::new()).unwrap().outcome().await;
        assert!(matches!(outcome, Ok(PipelineOutcome::Saved(_))));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_after_setup_once() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::ok());
        let counting = Arc::new(CountingSinks::default());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let outcome = pipeline
            .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), sinks(&counting))
            .unwrap()
            .outcome()
            .await
            .unwrap();

        let PipelineOutcome::Saved(account) = outcome else {
            panic!("expected saved account");
        };
        assert_eq!(account.id, Some(AccountId::new(1)));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
        assert_eq!(store.backups.load(Ordering::SeqCst), 0);
        assert_eq!(counting.saved.load(Ordering::SeqCst), 1);
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_save_after_edit_once() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::ok());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let mut req = request(FlowMode::Edit, "imap.example.com", "jane");
        req.account_id = Some(AccountId::new(7));
        pipeline
            .proceed(req, Sinks::new())
            .unwrap()
            .outcome()
            .await
            .unwrap();

        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.backups.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_failures_do_not_save() {
        let cases = [
            CheckResult::SecurityRequired {
                host: "imap.example.com".to_string(),
            },
            CheckResult::Error {
                reason: CheckErrorReason::AuthenticationFailed,
                message: "bad password".to_string(),
            },
        ];
        for result in cases {
            let store = Arc::new(MockStore::default());
            let checker = Arc::new(MockChecker::returning(result));
            let pipeline = SetupPipeline::new(store.clone(), checker);

            let err = pipeline
                .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), Sinks::new())
                .unwrap()
                .outcome()
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::ConnectivitySecurityRequired { .. } | Error::ConnectivityError { .. }
            ));
            assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_policy_from_check_applied() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::returning(CheckResult::Ok {
            policy: Some(Policy {
                max_email_lookback: Some(SyncWindow::OneWeek),
                ..Default::default()
            }),
        }));
        let pipeline = SetupPipeline::new(store, checker);

        let mut req = request(FlowMode::Normal, "imap.example.com", "jane");
        req.account.sync_lookback = SyncWindow::All;
        let PipelineOutcome::Saved(account) = pipeline
            .proceed(req, Sinks::new())
            .unwrap()
            .outcome()
            .await
            .unwrap()
        else {
            panic!("expected saved account");
        };
        assert_eq!(account.sync_lookback, SyncWindow::OneWeek);
        assert!(account.policy.is_some());
    }

    #[tokio::test]
    async fn test_autodiscover_result_without_request_is_illegal() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::returning(CheckResult::AutoDiscover {
            code: 0,
            host_auth: None,
        }));
        let pipeline = SetupPipeline::new(store.clone(), checker);

        let err = pipeline
            .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), Sinks::new())
            .unwrap()
            .outcome()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalFlowState(_)));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_autodiscover_needs_permission() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::ok());
        let pipeline = SetupPipeline::new(store, checker.clone());

        let mut req = request(FlowMode::Normal, "mail.example.com", "jane");
        req.check_mode = CheckSettingsMode::AUTODISCOVER;
        let err = pipeline
            .proceed(req, Sinks::new())
            .unwrap()
            .outcome()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalFlowState(_)));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_autodiscover_result_returned() {
        let mut discovered = HostAuth::new(Protocol::Eas);
        discovered.address = "eas.example.com".to_string();
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::returning(CheckResult::AutoDiscover {
            code: 0,
            host_auth: Some(discovered.clone()),
        }));
        let pipeline = SetupPipeline::new(store.clone(), checker);

        let mut req = request(FlowMode::AccountManagerEas, "mail.example.com", "jane");
        req.check_mode = CheckSettingsMode::AUTODISCOVER;
        req.allow_autodiscover = true;
        let outcome = pipeline
            .proceed(req, Sinks::new())
            .unwrap()
            .outcome()
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PipelineOutcome::AutoDiscovered {
                code: 0,
                host_auth: Some(discovered),
            }
        );
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_failure_reported() {
        let store = Arc::new(MockStore {
            fail_save: true,
            ..Default::default()
        });
        let checker = Arc::new(MockChecker::ok());
        let counting = Arc::new(CountingSinks::default());
        let pipeline = SetupPipeline::new(store, checker);

        let result = pipeline
            .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), sinks(&counting))
            .unwrap()
            .outcome()
            .await;
        assert!(result.is_err());
        assert_eq!(counting.failed.load(Ordering::SeqCst), 1);
        assert_eq!(counting.saved.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_debounce() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::gated(gate.clone()));
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let first = pipeline
            .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), Sinks::new())
            .unwrap();
        assert!(pipeline.is_busy());
        assert!(
            pipeline
                .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), Sinks::new())
                .is_none()
        );

        gate.notify_one();
        first.outcome().await.unwrap();
        assert!(!pipeline.is_busy());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        let again = pipeline.proceed(
            request(FlowMode::Normal, "imap.other.com", "jane"),
            Sinks::new(),
        );
        assert!(again.is_some());
        gate.notify_one();
        again.unwrap().outcome().await.unwrap();
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_discards_run() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::gated(gate.clone()));
        let counting = Arc::new(CountingSinks::default());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let handle = pipeline
            .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), sinks(&counting))
            .unwrap();
        while checker.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        handle.cancel();
        gate.notify_one();
        assert!(matches!(handle.outcome().await, Err(Error::Cancelled)));
        assert!(!pipeline.is_busy());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        assert_eq!(counting.checks.load(Ordering::SeqCst), 0);
        assert_eq!(counting.saved.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_save_keeps_outcome() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::ok());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let handle = pipeline
            .proceed(request(FlowMode::Normal, "imap.example.com", "jane"), Sinks::new())
            .unwrap();
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }

        handle.cancel();
        let outcome = handle.outcome().await;
        assert!(matches!(outcome, Ok(PipelineOutcome::Saved(_))));
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_check_mode_skips_checker() {
        let store = Arc::new(MockStore::default());
        let checker = Arc::new(MockChecker::ok());
        let pipeline = SetupPipeline::new(store.clone(), checker.clone());

        let mut req = request(FlowMode::Normal, "imap.example.com", "jane");
        req.check_mode = CheckSettingsMode::empty();
        pipeline
            .proceed(req, Sinks::new())
            .unwrap()
            .outcome()
            .await
            .unwrap();
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_from_session() {
        let mut session = SetupSession::new(FlowMode::Normal);
        session
            .apply_manual_defaults(Protocol::Pop3, "jane@example.com", "pw")
            .unwrap();
        session.is_default = true;

        let req = ProceedRequest::from_session(&session, CheckSettingsMode::INCOMING);
        assert_eq!(req.check_host, "pop3.example.com");
        assert_eq!(req.check_login, "jane@example.com");
        assert_eq!(req.account_id, None);
        assert_eq!(req.flow_mode, FlowMode::Normal);
        assert!(req.account.is_default());
        assert_eq!(req.changed, ChangedFields::all());
    }
}
