//! Account persistence consumed by the pipeline.

use async_trait::async_trait;

use crate::Result;
use crate::account::{Account, AccountId, ChangedFields};

/// Account storage the setup pipeline reads and writes.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds an account whose incoming server uses `host` and `login`.
    ///
    /// The account `exclude` is skipped so an account never duplicates itself.
    /// Hostnames compare case-insensitively.
    async fn find_existing_account(
        &self,
        exclude: Option<AccountId>,
        host: &str,
        login: &str,
    ) -> Result<Option<Account>>;

    /// Saves a new account and its server settings as one unit, filling in ids.
    async fn save_account(&self, account: &mut Account) -> Result<()>;

    /// Writes the `changed` fields of an existing account, filling in ids of
    /// server settings stored for the first time.
    async fn update_account(&self, account: &mut Account, changed: ChangedFields) -> Result<()>;

    /// Snapshots stored accounts so edits can be recovered.
    async fn backup(&self) -> Result<()>;
}
