//! End-to-end setup and edit flows against an in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use mailsetup_core::{
    Account, AccountStore, ChangedFields, CheckResult, CheckSettingsMode, ConnectivityChecker,
    Error, FlowMode, PipelineOutcome, ProceedRequest, Prompt, PromptAction, PromptChoice, Protocol,
    ServerSettingsEditor, ServerSide, SetupPipeline, SetupSession, SetupStep, Sinks,
    SqliteAccountStore,
};
use mailsetup_provider::ProviderCatalog;

struct AcceptAll;

#[async_trait]
impl ConnectivityChecker for AcceptAll {
    async fn check(&self, _mode: CheckSettingsMode, _account: &Account) -> CheckResult {
        CheckResult::Ok { policy: None }
    }
}

async fn set_up_gmail(pipeline: &SetupPipeline, email: &str) -> mailsetup_core::Result<Account> {
    let catalog = ProviderCatalog::layered(None, None);
    let provider = catalog.find_provider_for_email(email).unwrap();

    let mut session = SetupSession::new(FlowMode::Normal);
    assert_eq!(session.initial_step(), SetupStep::Basics);
    session.apply_provider(&provider, email, "app-password")?;
    session.is_default = true;

    let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);
    let handle = editor
        .on_next_button(&mut session, pipeline, Sinks::new())?
        .unwrap();
    match handle.outcome().await? {
        PipelineOutcome::Saved(account) => {
            assert_eq!(session.complete(), FlowMode::ReturnToMessageList);
            Ok(account)
        }
        PipelineOutcome::AutoDiscovered { .. } => panic!("unexpected autodiscover"),
    }
}

#[tokio::test]
async fn test_provider_setup_then_duplicate() {
    let store = Arc::new(SqliteAccountStore::in_memory().await.unwrap());
    let pipeline = SetupPipeline::new(store.clone(), Arc::new(AcceptAll));

    let saved = set_up_gmail(&pipeline, "jane@gmail.com").await.unwrap();
    assert!(saved.id.is_some());

    let stored = store.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_default());
    let recv = stored[0].host_auth_recv.as_ref().unwrap();
    assert_eq!(recv.address, "imap.gmail.com");
    assert_eq!(recv.password, "app-password");

    let err = set_up_gmail(&pipeline, "jane@gmail.com").await.unwrap_err();
    let prompt = Prompt::for_error(&err).unwrap();
    assert!(matches!(prompt, Prompt::DuplicateAccount { .. }));
    assert_eq!(prompt.resolve(PromptChoice::Confirm), PromptAction::EditSettings);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_edit_updates_and_backs_up() {
    let store = Arc::new(SqliteAccountStore::in_memory().await.unwrap());
    let pipeline = SetupPipeline::new(store.clone(), Arc::new(AcceptAll));
    let saved = set_up_gmail(&pipeline, "jane@gmail.com").await.unwrap();

    let loaded = store.get(saved.id.unwrap()).await.unwrap().unwrap();
    let mut session = SetupSession::builder(FlowMode::Edit).account(loaded).build();
    assert_eq!(session.initial_step(), SetupStep::ServerSettings(Protocol::Imap));
    session.account.sender_name = "Jane Doe".to_string();
    assert_eq!(session.changed_fields(), ChangedFields::SENDER_NAME);

    let restored = SetupSession::from_bundle(&session.to_bundle().unwrap()).unwrap();
    let request = ProceedRequest::from_session(&restored, CheckSettingsMode::empty());
    let outcome = pipeline
        .proceed(request, Sinks::new())
        .unwrap()
        .outcome()
        .await
        .unwrap();
    assert!(matches!(outcome, PipelineOutcome::Saved(_)));
    assert_eq!(session.complete(), FlowMode::ReturnToCaller);

    let reloaded = store.get(saved.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(reloaded.sender_name, "Jane Doe");
    assert_eq!(store.latest_backups().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_manual_setup_with_security_prompt() {
    struct NeedsCertificate;

    #[async_trait]
    impl ConnectivityChecker for NeedsCertificate {
        async fn check(&self, _mode: CheckSettingsMode, account: &Account) -> CheckResult {
            let recv = account.host_auth_recv.as_ref().unwrap();
            if recv.flags.contains(mailsetup_core::HostAuthFlags::TRUST_ALL) {
                CheckResult::Ok { policy: None }
            } else {
                CheckResult::SecurityRequired {
                    host: recv.address.clone(),
                }
            }
        }
    }

    let store = Arc::new(SqliteAccountStore::in_memory().await.unwrap());
    let pipeline = SetupPipeline::new(store.clone(), Arc::new(NeedsCertificate));

    let mut session = SetupSession::new(FlowMode::Normal);
    session
        .apply_manual_defaults(Protocol::Imap, "jane@example.com", "pw")
        .unwrap();
    let editor = ServerSettingsEditor::new(ServerSide::Incoming, &session);

    let err = editor
        .on_next_button(&mut session, &pipeline, Sinks::new())
        .unwrap()
        .unwrap()
        .outcome()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ConnectivitySecurityRequired { ref host } if host == "imap.example.com"
    ));
    assert!(store.list().await.unwrap().is_empty());

    let prompt = Prompt::for_error(&err).unwrap();
    assert_eq!(prompt.resolve(PromptChoice::Confirm), PromptAction::AcceptCertificate);
    editor.accept_certificate(&mut session);

    let outcome = editor
        .on_next_button(&mut session, &pipeline, Sinks::new())
        .unwrap()
        .unwrap()
        .outcome()
        .await
        .unwrap();
    assert!(matches!(outcome, PipelineOutcome::Saved(_)));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_duplicate_lookup_is_case_insensitive() {
    let store = SqliteAccountStore::in_memory().await.unwrap();
    let mut session = SetupSession::new(FlowMode::Normal);
    session
        .apply_manual_defaults(Protocol::Pop3, "jane@example.com", "pw")
        .unwrap();
    let mut account = session.account.clone();
    store.save_account(&mut account).await.unwrap();

    let found = store
        .find_existing_account(None, "POP3.Example.com", "jane@example.com")
        .await
        .unwrap();
    assert_eq!(found.and_then(|a| a.id), account.id);

    let excluded = store
        .find_existing_account(account.id, "pop3.example.com", "jane@example.com")
        .await
        .unwrap();
    assert!(excluded.is_none());
}
