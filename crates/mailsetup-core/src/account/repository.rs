//! `SQLite` account store.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info, warn};

use super::credentials;
use super::host_auth::{HostAuth, HostAuthFlags, HostAuthId, Protocol};
use super::model::{Account, AccountFlags, AccountId, ChangedFields, SyncWindow};
use crate::pipeline::AccountStore;
use crate::{Error, Result};

/// Where server passwords are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialVault {
    /// System keyring; the database keeps an empty placeholder.
    #[default]
    Keyring,
    /// Database column (tests and headless systems).
    Database,
}

/// Account snapshot written by [`SqliteAccountStore::backup`].
#[derive(Debug, Clone)]
pub struct AccountBackup {
    /// Account the snapshot belongs to.
    pub account_id: AccountId,
    /// Account as it was at backup time, without passwords.
    pub account: Account,
    /// RFC 3339 timestamp of the backup.
    pub created_at: String,
}

/// Repository for account storage and retrieval.
pub struct SqliteAccountStore {
    pool: SqlitePool,
    vault: CredentialVault,
}

const ACCOUNT_COLUMNS: &str = r"
    id, display_name, email_address, sender_name, signature, flags,
    sync_interval, sync_lookback, security_sync_key,
    host_auth_recv_id, host_auth_send_id, policy
";

impl SqliteAccountStore {
    /// Create a new store with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str, vault: CredentialVault) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool, vault };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// Passwords are kept in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self {
            pool,
            vault: CredentialVault::Database,
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS host_auths (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                protocol TEXT NOT NULL,
                address TEXT NOT NULL,
                port INTEGER NOT NULL,
                flags INTEGER NOT NULL DEFAULT 0,
                login TEXT NOT NULL,
                password TEXT NOT NULL,
                domain TEXT,
                client_cert_alias TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name TEXT NOT NULL,
                email_address TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                signature TEXT NOT NULL,
                flags INTEGER NOT NULL DEFAULT 0,
                sync_interval INTEGER NOT NULL,
                sync_lookback TEXT NOT NULL,
                security_sync_key TEXT,
                host_auth_recv_id INTEGER REFERENCES host_auths(id),
                host_auth_send_id INTEGER REFERENCES host_auths(id),
                policy TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS account_backups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get all accounts, default account first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY (flags & {}) DESC, display_name ASC",
            AccountFlags::DEFAULT.bits()
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            accounts.push(self.row_to_account(row).await?);
        }
        Ok(accounts)
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_account(&row).await?)),
            None => Ok(None),
        }
    }

    /// Delete an account and its server settings.
    ///
    /// Also removes passwords from the system keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        let Some(account) = self.get(id).await? else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let host_auth_ids: Vec<HostAuthId> = [&account.host_auth_recv, &account.host_auth_send]
            .into_iter()
            .flatten()
            .filter_map(|ha| ha.id)
            .collect();
        for ha_id in &host_auth_ids {
            sqlx::query("DELETE FROM host_auths WHERE id = ?")
                .bind(ha_id.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        if self.vault == CredentialVault::Keyring {
            for ha_id in host_auth_ids {
                if let Err(e) = credentials::delete_password(ha_id) {
                    warn!("Failed to delete credentials from keyring: {e}");
                }
            }
        }

        Ok(())
    }

    /// Most recent backup snapshot of every account.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a snapshot cannot be decoded.
    pub async fn latest_backups(&self) -> Result<Vec<AccountBackup>> {
        let rows = sqlx::query(
            r"
            SELECT account_id, snapshot, created_at FROM account_backups
            WHERE id IN (SELECT MAX(id) FROM account_backups GROUP BY account_id)
            ORDER BY account_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AccountBackup> {
                Ok(AccountBackup {
                    account_id: AccountId::new(row.get("account_id")),
                    account: serde_json::from_str(row.get("snapshot"))?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    /// Convert a database row to an Account, loading its server settings.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn row_to_account(&self, row: &SqliteRow) -> Result<Account> {
        let recv_id: Option<i64> = row.get("host_auth_recv_id");
        let send_id: Option<i64> = row.get("host_auth_send_id");
        let policy: Option<String> = row.get("policy");

        let host_auth_recv = match recv_id {
            Some(id) => self.load_host_auth(HostAuthId(id)).await?,
            None => None,
        };
        let host_auth_send = match send_id {
            Some(id) => self.load_host_auth(HostAuthId(id)).await?,
            None => None,
        };

        Ok(Account {
            id: Some(AccountId::new(row.get("id"))),
            display_name: row.get("display_name"),
            email_address: row.get("email_address"),
            sender_name: row.get("sender_name"),
            signature: row.get("signature"),
            flags: AccountFlags::from_bits_truncate(row.get::<i64, _>("flags") as u32),
            sync_interval: row.get::<i64, _>("sync_interval") as i32,
            sync_lookback: string_to_sync_window(row.get("sync_lookback")),
            security_sync_key: row.get("security_sync_key"),
            host_auth_recv,
            host_auth_send,
            policy: policy.as_deref().map(serde_json::from_str).transpose()?,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn load_host_auth(&self, id: HostAuthId) -> Result<Option<HostAuth>> {
        let row = sqlx::query(
            r"
            SELECT id, protocol, address, port, flags, login, password, domain, client_cert_alias
            FROM host_auths WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            warn!("Account references missing host auth {}", id.0);
            return Ok(None);
        };

        let protocol: String = row.get("protocol");
        Ok(Some(HostAuth {
            id: Some(id),
            protocol: Protocol::from_scheme(&protocol).unwrap_or_default(),
            address: row.get("address"),
            port: row.get::<i64, _>("port") as u16,
            flags: HostAuthFlags::from_bits_truncate(row.get::<i64, _>("flags") as u32),
            login: row.get("login"),
            password: self.load_password(id, &row),
            domain: row.get("domain"),
            client_cert_alias: row.get("client_cert_alias"),
        }))
    }

    /// Loads a password from the keyring, falling back to the database column.
    fn load_password(&self, id: HostAuthId, row: &SqliteRow) -> String {
        if self.vault == CredentialVault::Database {
            return row.get("password");
        }
        match credentials::get_password(id) {
            Ok(Some(password)) => password,
            Ok(None) => row.get("password"),
            Err(e) => {
                warn!("Failed to load password from keyring: {e}");
                row.get("password")
            }
        }
    }

    /// Inserts or updates one host-auth record inside `tx`, returning its id.
    ///
    /// Ids of inserted rows are pushed to `inserted`.
    async fn write_host_auth(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        host_auth: &HostAuth,
        inserted: &mut Vec<HostAuthId>,
    ) -> Result<HostAuthId> {
        let db_password = match self.vault {
            CredentialVault::Keyring => "",
            CredentialVault::Database => host_auth.password.as_str(),
        };

        let id = if let Some(id) = host_auth.id {
            sqlx::query(
                r"
                UPDATE host_auths SET
                    protocol = ?, address = ?, port = ?, flags = ?,
                    login = ?, password = ?, domain = ?, client_cert_alias = ?
                WHERE id = ?
                ",
            )
            .bind(host_auth.protocol.scheme())
            .bind(&host_auth.address)
            .bind(i64::from(host_auth.port))
            .bind(i64::from(host_auth.flags.bits()))
            .bind(&host_auth.login)
            .bind(db_password)
            .bind(&host_auth.domain)
            .bind(&host_auth.client_cert_alias)
            .bind(id.0)
            .execute(&mut **tx)
            .await?;
            id
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO host_auths (
                    protocol, address, port, flags, login, password, domain, client_cert_alias
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(host_auth.protocol.scheme())
            .bind(&host_auth.address)
            .bind(i64::from(host_auth.port))
            .bind(i64::from(host_auth.flags.bits()))
            .bind(&host_auth.login)
            .bind(db_password)
            .bind(&host_auth.domain)
            .bind(&host_auth.client_cert_alias)
            .execute(&mut **tx)
            .await?;
            let id = HostAuthId(result.last_insert_rowid());
            inserted.push(id);
            id
        };

        // Written before commit so a keyring failure rolls the transaction back.
        if self.vault == CredentialVault::Keyring {
            credentials::store_password(id, &host_auth.password)?;
        }
        Ok(id)
    }

    /// Writes the account row inside `tx`.
    async fn write_account_row(
        tx: &mut Transaction<'_, Sqlite>,
        account: &Account,
        policy: Option<String>,
    ) -> Result<AccountId> {
        let recv_id = account
            .host_auth_recv
            .as_ref()
            .and_then(|ha| ha.id)
            .map(|id| id.0);
        let send_id = account
            .host_auth_send
            .as_ref()
            .and_then(|ha| ha.id)
            .map(|id| id.0);

        let query = if account.id.is_some() {
            r"
            UPDATE accounts SET
                display_name = ?, email_address = ?, sender_name = ?, signature = ?,
                flags = ?, sync_interval = ?, sync_lookback = ?, security_sync_key = ?,
                host_auth_recv_id = ?, host_auth_send_id = ?, policy = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "
        } else {
            r"
            INSERT INTO accounts (
                display_name, email_address, sender_name, signature,
                flags, sync_interval, sync_lookback, security_sync_key,
                host_auth_recv_id, host_auth_send_id, policy
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "
        };

        let mut statement = sqlx::query(query)
            .bind(&account.display_name)
            .bind(&account.email_address)
            .bind(&account.sender_name)
            .bind(&account.signature)
            .bind(i64::from(account.flags.bits()))
            .bind(i64::from(account.sync_interval))
            .bind(sync_window_to_string(account.sync_lookback))
            .bind(&account.security_sync_key)
            .bind(recv_id)
            .bind(send_id)
            .bind(policy);
        if let Some(id) = account.id {
            statement = statement.bind(id.0);
        }
        let result = statement.execute(&mut **tx).await?;

        match account.id {
            Some(id) if result.rows_affected() == 0 => Err(Error::AccountNotFound(id.to_string())),
            Some(id) => Ok(id),
            None => Ok(AccountId::new(result.last_insert_rowid())),
        }
    }

    /// Writes `account` and the server settings selected by `changed` in one
    /// transaction, filling in host-auth ids.
    async fn write_account(
        &self,
        account: &mut Account,
        changed: ChangedFields,
        inserted: &mut Vec<HostAuthId>,
    ) -> Result<AccountId> {
        let policy = account.policy.as_ref().map(serde_json::to_string).transpose()?;

        let mut tx = self.pool.begin().await?;
        if changed.contains(ChangedFields::INCOMING)
            && let Some(recv) = account.host_auth_recv.as_mut()
        {
            recv.id = Some(self.write_host_auth(&mut tx, recv, inserted).await?);
        }
        if changed.contains(ChangedFields::OUTGOING)
            && let Some(send) = account.host_auth_send.as_mut()
        {
            send.id = Some(self.write_host_auth(&mut tx, send, inserted).await?);
        }
        let id = Self::write_account_row(&mut tx, account, policy).await?;
        Self::clear_other_defaults(&mut tx, account, id).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Runs [`Self::write_account`], removing keyring passwords of host-auth
    /// rows that a failed transaction rolled back.
    async fn write_account_or_discard(
        &self,
        account: &mut Account,
        changed: ChangedFields,
    ) -> Result<AccountId> {
        let mut inserted = Vec::new();
        let result = self.write_account(account, changed, &mut inserted).await;
        if result.is_err() {
            self.discard_passwords(&inserted);
        }
        result
    }

    fn discard_passwords(&self, ids: &[HostAuthId]) {
        if self.vault != CredentialVault::Keyring {
            return;
        }
        for &id in ids {
            if let Err(e) = credentials::delete_password(id) {
                warn!("Failed to remove password of rolled-back host auth {}: {e}", id.0);
            }
        }
    }

    /// If `account` is the default, clears the flag on every other account.
    async fn clear_other_defaults(
        tx: &mut Transaction<'_, Sqlite>,
        account: &Account,
        id: AccountId,
    ) -> Result<()> {
        if account.is_default() {
            sqlx::query("UPDATE accounts SET flags = flags & ? WHERE id != ?")
                .bind(i64::from((!AccountFlags::DEFAULT).bits()))
                .bind(id.0)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn find_existing_account(
        &self,
        exclude: Option<AccountId>,
        host: &str,
        login: &str,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(
            r"
            SELECT a.id FROM accounts a
            JOIN host_auths h ON h.id = a.host_auth_recv_id
            WHERE lower(h.address) = lower(?) AND h.login = ? AND a.id != ?
            ORDER BY a.id
            LIMIT 1
            ",
        )
        .bind(host.trim())
        .bind(login.trim())
        .bind(exclude.map_or(-1, |id| id.0))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.get(AccountId::new(row.get("id"))).await,
            None => Ok(None),
        }
    }

    /// Save an account and both host-auth records in one transaction.
    ///
    /// Assigns record ids to `account` on success.
    async fn save_account(&self, account: &mut Account) -> Result<()> {
        let mut draft = account.clone();
        let id = self
            .write_account_or_discard(&mut draft, ChangedFields::all())
            .await?;

        draft.id = Some(id);
        *account = draft;
        info!("Saved account {} ({})", id, account.email_address);
        Ok(())
    }

    async fn update_account(&self, account: &mut Account, changed: ChangedFields) -> Result<()> {
        let id = account
            .id
            .ok_or_else(|| Error::AccountNotFound("unsaved account".to_string()))?;
        if changed.is_empty() {
            debug!("No changes to account {id}");
            return Ok(());
        }

        let mut draft = account.clone();
        self.write_account_or_discard(&mut draft, changed).await?;
        *account = draft;

        debug!("Updated account {id}: {changed:?}");
        Ok(())
    }

    async fn backup(&self) -> Result<()> {
        let accounts = self.list().await?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        for mut account in accounts {
            let Some(id) = account.id else { continue };
            for ha in [&mut account.host_auth_recv, &mut account.host_auth_send]
                .into_iter()
                .flatten()
            {
                ha.password.clear();
            }
            sqlx::query(
                "INSERT INTO account_backups (account_id, snapshot, created_at) VALUES (?, ?, ?)",
            )
            .bind(id.0)
            .bind(serde_json::to_string(&account)?)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!("Backed up accounts at {created_at}");
        Ok(())
    }
}

const fn sync_window_to_string(window: SyncWindow) -> &'static str {
    match window {
        SyncWindow::Auto => "auto",
        SyncWindow::OneDay => "one_day",
        SyncWindow::ThreeDays => "three_days",
        SyncWindow::OneWeek => "one_week",
        SyncWindow::TwoWeeks => "two_weeks",
        SyncWindow::OneMonth => "one_month",
        SyncWindow::All => "all",
    }
}

fn string_to_sync_window(s: &str) -> SyncWindow {
    match s {
        "one_day" => SyncWindow::OneDay,
        "three_days" => SyncWindow::ThreeDays,
        "one_week" => SyncWindow::OneWeek,
        "two_weeks" => SyncWindow::TwoWeeks,
        "one_month" => SyncWindow::OneMonth,
        "all" => SyncWindow::All,
        _ => SyncWindow::Auto,
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
    use crate::account::Policy;

    fn account(email: &str, host: &str) -> Account {
        let mut account = Account::with_email(email);
        let recv = account.host_auth_recv_mut(Protocol::Imap);
        recv.address = host.to_string();
        recv.port = 993;
        recv.flags = HostAuthFlags::SSL;
        recv.set_login(email, "secret");
        let send = account.host_auth_send_mut(Protocol::Smtp);
        send.address = host.replace("imap", "smtp");
        send.port = 465;
        send.set_login(email, "secret");
        account
    }

    #[tokio::test]
    async fn test_create_and_retrieve_account() {
        let store = SqliteAccountStore::in_memory().await.unwrap();

        let mut acc = account("test@example.com", "imap.example.com");
        acc.policy = Some(Policy {
            password_min_length: 6,
            ..Default::default()
        });
        acc.sync_lookback = SyncWindow::TwoWeeks;
        store.save_account(&mut acc).await.unwrap();
        assert!(acc.id.is_some());
        assert!(acc.host_auth_recv.as_ref().unwrap().id.is_some());

        let retrieved = store.get(acc.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(retrieved, acc);
        assert_eq!(retrieved.host_auth_recv.as_ref().unwrap().password, "secret");
    }

    #[tokio::test]
    async fn test_list_accounts_default_first() {
        let store = SqliteAccountStore::in_memory().await.unwrap();

        let mut first = account("a@example.com", "imap.example.com");
        store.save_account(&mut first).await.unwrap();
        let mut second = account("b@example.com", "imap.example.com");
        second.set_default(true);
        store.save_account(&mut second).await.unwrap();

        let accounts = store.list().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].email_address, "b@example.com");
    }

    #[tokio::test]
    async fn test_single_default() {
        let store = SqliteAccountStore::in_memory().await.unwrap();

        let mut first = account("a@example.com", "imap.example.com");
        first.set_default(true);
        store.save_account(&mut first).await.unwrap();
        let mut second = account("b@example.com", "imap.example.com");
        second.set_default(true);
        store.save_account(&mut second).await.unwrap();

        let first = store.get(first.id.unwrap()).await.unwrap().unwrap();
        assert!(!first.is_default());
    }

    #[tokio::test]
    async fn test_find_existing_account() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut acc = account("jane@example.com", "imap.example.com");
        store.save_account(&mut acc).await.unwrap();

        let found = store
            .find_existing_account(None, "IMAP.example.com", "jane@example.com")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, acc.id);

        let excluded = store
            .find_existing_account(acc.id, "imap.example.com", "jane@example.com")
            .await
            .unwrap();
        assert!(excluded.is_none());

        let other_login = store
            .find_existing_account(None, "imap.example.com", "john@example.com")
            .await
            .unwrap();
        assert!(other_login.is_none());
    }

    #[tokio::test]
    async fn test_update_account() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut acc = account("jane@example.com", "imap.example.com");
        store.save_account(&mut acc).await.unwrap();

        let original = acc.clone();
        acc.signature = "-- Jane".to_string();
        acc.host_auth_recv_mut(Protocol::Imap).port = 1993;
        let changed = acc.changed_fields(&original);
        store.update_account(&mut acc, changed).await.unwrap();

        let retrieved = store.get(acc.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(retrieved.signature, "-- Jane");
        assert_eq!(retrieved.host_auth_recv.unwrap().port, 1993);
    }

    #[tokio::test]
    async fn test_update_unsaved_account_fails() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut acc = account("jane@example.com", "imap.example.com");
        let err = store
            .update_account(&mut acc, ChangedFields::SIGNATURE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_links_new_host_auth() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut acc = account("jane@example.com", "imap.example.com");
        acc.host_auth_send = None;
        store.save_account(&mut acc).await.unwrap();
        let recv_id = acc.host_auth_recv.as_ref().unwrap().id;

        let send = acc.host_auth_send_mut(Protocol::Smtp);
        send.address = "smtp.example.com".to_string();
        send.port = 465;
        send.set_login("jane@example.com", "secret");
        store
            .update_account(&mut acc, ChangedFields::OUTGOING)
            .await
            .unwrap();
        let send_id = acc.host_auth_send.as_ref().unwrap().id;
        assert!(send_id.is_some());

        let retrieved = store.get(acc.id.unwrap()).await.unwrap().unwrap();
        let stored_send = retrieved.host_auth_send.as_ref().unwrap();
        assert_eq!(stored_send.id, send_id);
        assert_eq!(stored_send.address, "smtp.example.com");
        assert_eq!(retrieved.host_auth_recv.as_ref().unwrap().id, recv_id);

        // A second edit updates the linked row instead of inserting another.
        acc.host_auth_send_mut(Protocol::Smtp).port = 587;
        store
            .update_account(&mut acc, ChangedFields::OUTGOING)
            .await
            .unwrap();
        assert_eq!(acc.host_auth_send.as_ref().unwrap().id, send_id);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM host_auths")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_failed_write_reports_inserted_host_auths() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut saved = account("jane@example.com", "imap.example.com");
        store.save_account(&mut saved).await.unwrap();

        let mut missing = saved.clone();
        missing.id = Some(AccountId::new(404));
        missing.host_auth_send.as_mut().unwrap().id = None;
        let mut inserted = Vec::new();
        let err = store
            .write_account(&mut missing, ChangedFields::all(), &mut inserted)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountNotFound(_)));
        assert_eq!(inserted.len(), 1);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM host_auths")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    #[ignore = "Interacts with system keyring"]
    async fn test_failed_update_removes_keyring_passwords() {
        let mut store = SqliteAccountStore::in_memory().await.unwrap();
        store.vault = CredentialVault::Keyring;
        // High ids to avoid touching real entries.
        sqlx::query("INSERT INTO sqlite_sequence (name, seq) VALUES ('host_auths', 99990)")
            .execute(&store.pool)
            .await
            .unwrap();

        let mut acc = account("jane@example.com", "imap.example.com");
        acc.id = Some(AccountId::new(404));
        let err = store
            .update_account(&mut acc, ChangedFields::all())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountNotFound(_)));
        assert!(acc.host_auth_recv.as_ref().unwrap().id.is_none());
        for id in [99991, 99992] {
            assert_eq!(credentials::get_password(HostAuthId(id)).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_delete_account() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut acc = account("jane@example.com", "imap.example.com");
        store.save_account(&mut acc).await.unwrap();

        store.delete(acc.id.unwrap()).await.unwrap();
        assert!(store.get(acc.id.unwrap()).await.unwrap().is_none());
        assert!(
            store
                .find_existing_account(None, "imap.example.com", "jane@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_backup_strips_passwords() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let mut acc = account("jane@example.com", "imap.example.com");
        store.save_account(&mut acc).await.unwrap();

        store.backup().await.unwrap();
        store.backup().await.unwrap();

        let backups = store.latest_backups().await.unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].account_id, acc.id.unwrap());
        assert_eq!(backups[0].account.email_address, "jane@example.com");
        assert!(backups[0].account.host_auth_recv.as_ref().unwrap().password.is_empty());
    }

    #[test]
    fn test_sync_window_strings() {
        for window in [
            SyncWindow::Auto,
            SyncWindow::OneDay,
            SyncWindow::ThreeDays,
            SyncWindow::OneWeek,
            SyncWindow::TwoWeeks,
            SyncWindow::OneMonth,
            SyncWindow::All,
        ] {
            assert_eq!(string_to_sync_window(sync_window_to_string(window)), window);
        }
    }
}
