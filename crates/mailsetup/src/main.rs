//! `mailsetup` - mail account setup from the command line
//!
//! Looks up provider settings, guesses server names and manages the account
//! database written by the setup pipeline.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mailsetup_core::{AccountStore, SqliteAccountStore};
use mailsetup_provider::{
    ServerRole, find_oauth_provider, infer_server_name, load_oauth_providers, split_email,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "mailsetup", version, about = "Mail account setup helper")]
struct Cli {
    /// Settings file (default: <config dir>/mailsetup/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show server settings for an email address.
    Lookup {
        /// Email address to look up.
        email: String,
        /// Use the provider's fallback servers.
        #[arg(long)]
        fallback: bool,
    },
    /// Guess a server hostname from a domain or partial hostname.
    Infer {
        /// Domain or hostname typed by the user.
        server: String,
        /// Guess an incoming server with this prefix.
        #[arg(long, value_name = "PREFIX", conflicts_with = "outgoing")]
        incoming: Option<String>,
        /// Guess an outgoing server with this prefix.
        #[arg(long, value_name = "PREFIX")]
        outgoing: Option<String>,
    },
    /// List `OAuth2` providers, or print the sign-in URL of one.
    Oauth {
        /// Provider id.
        id: Option<String>,
        /// Address to pre-fill on the sign-in page.
        #[arg(long)]
        login_hint: Option<String>,
    },
    /// List stored accounts.
    Accounts,
    /// Snapshot stored accounts and list the latest snapshots.
    Backup,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailsetup=info,mailsetup_core=info,mailsetup_provider=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings_path = cli.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path).await?;
    debug!("Loaded settings from {}", settings_path.display());

    match cli.command {
        Command::Lookup { email, fallback } => lookup(&settings, &email, fallback),
        Command::Infer {
            server,
            incoming,
            outgoing,
        } => {
            let role = match (&incoming, &outgoing) {
                (_, Some(prefix)) => ServerRole::Outgoing(prefix),
                (Some(prefix), None) => ServerRole::Incoming(prefix),
                (None, None) => ServerRole::Incoming("imap"),
            };
            println!("{}", infer_server_name(&server, role));
            Ok(())
        }
        Command::Oauth { id, login_hint } => oauth(&settings, id.as_deref(), login_hint.as_deref()),
        Command::Accounts => accounts(&settings).await,
        Command::Backup => backup(&settings).await,
    }
}

fn lookup(settings: &Settings, email: &str, fallback: bool) -> Result<()> {
    let Some((_, domain)) = split_email(email) else {
        bail!("{email} is not an email address");
    };

    let Some(mut provider) = settings.provider_catalog().find_provider_for_email(email) else {
        println!("No provider entry for {domain}; guessed servers:");
        println!("  incoming: {}", infer_server_name(domain, ServerRole::Incoming("imap")));
        println!("  outgoing: {}", infer_server_name(domain, ServerRole::Outgoing("smtp")));
        return Ok(());
    };

    if fallback && !provider.expand_alternate_templates(email) {
        bail!("{} has no fallback servers", provider.label);
    }

    println!("{} ({})", provider.label, provider.id);
    if let Some(note) = &provider.note {
        println!("  note:     {note}");
    }
    println!(
        "  incoming: {} as {}",
        provider.incoming_uri, provider.incoming_username
    );
    println!(
        "  outgoing: {} as {}",
        provider.outgoing_uri, provider.outgoing_username
    );
    if let Some(oauth) = &provider.oauth_provider_id {
        println!("  sign-in:  OAuth2 via {oauth}");
    }
    Ok(())
}

fn oauth(settings: &Settings, id: Option<&str>, login_hint: Option<&str>) -> Result<()> {
    let source = settings.oauth_source();

    let Some(id) = id else {
        for provider in load_oauth_providers(&source)? {
            println!("{:<12} {}", provider.id, provider.label);
        }
        return Ok(());
    };

    let provider = find_oauth_provider(&source, id)?
        .with_context(|| format!("no OAuth2 provider named {id}"))?;
    provider.validate()?;
    println!("{}", provider.authorization_url(login_hint)?);
    Ok(())
}

async fn open_store(settings: &Settings) -> Result<SqliteAccountStore> {
    let path = settings.database_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let path = path
        .to_str()
        .with_context(|| format!("database path {} is not UTF-8", path.display()))?;
    info!("Opening account database {path}");
    Ok(SqliteAccountStore::new(path, settings.credential_vault()).await?)
}

async fn accounts(settings: &Settings) -> Result<()> {
    let store = open_store(settings).await?;
    let accounts = store.list().await?;
    if accounts.is_empty() {
        println!("No accounts");
    }
    for account in accounts {
        let id = account.id.map(|id| id.to_string()).unwrap_or_default();
        let server = account
            .host_auth_recv
            .as_ref()
            .map(|ha| format!("{}://{}:{}", ha.protocol, ha.address, ha.port))
            .unwrap_or_default();
        let marker = if account.is_default() { "*" } else { " " };
        println!("{marker}{id:>4} {:<32} {server}", account.email_address);
    }
    Ok(())
}

async fn backup(settings: &Settings) -> Result<()> {
    let store = open_store(settings).await?;
    store.backup().await?;
    for snapshot in store.latest_backups().await? {
        println!(
            "{:>4} {:<32} {}",
            snapshot.account_id.0, snapshot.account.email_address, snapshot.created_at
        );
    }
    Ok(())
}
