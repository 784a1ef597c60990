//! Settings file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mailsetup_core::CredentialVault;
use mailsetup_provider::{CatalogSource, ProviderCatalog};
use serde::{Deserialize, Serialize};

/// Settings read from `<config dir>/mailsetup/settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Vendor provider catalog, consulted first.
    pub vendor_catalog: Option<PathBuf>,
    /// Product provider catalog, consulted before the built-in one.
    pub product_catalog: Option<PathBuf>,
    /// `OAuth2` provider catalog replacing the built-in one.
    pub oauth_catalog: Option<PathBuf>,
    /// Account database location.
    pub database_path: Option<PathBuf>,
    /// Keep passwords in the system keyring instead of the database.
    pub use_keyring: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vendor_catalog: None,
            product_catalog: None,
            oauth_catalog: None,
            database_path: None,
            use_keyring: true,
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailsetup")
            .join("settings.json")
    }

    /// Loads settings from `path`; a missing file gives the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Provider catalog layered as vendor, product, built-in.
    pub fn provider_catalog(&self) -> ProviderCatalog {
        ProviderCatalog::layered(
            self.vendor_catalog.clone().map(CatalogSource::File),
            self.product_catalog.clone().map(CatalogSource::File),
        )
    }

    /// `OAuth2` catalog source.
    pub fn oauth_source(&self) -> CatalogSource {
        self.oauth_catalog
            .clone()
            .map_or_else(CatalogSource::builtin_oauth, CatalogSource::File)
    }

    /// Account database path, under the data directory unless configured.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailsetup")
                .join("accounts.db")
        })
    }

    /// Where passwords are stored.
    pub const fn credential_vault(&self) -> CredentialVault {
        if self.use_keyring {
            CredentialVault::Keyring
        } else {
            CredentialVault::Database
        }
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

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "product_catalog": "/etc/mailsetup/providers.xml" }"#)
                .unwrap();
        assert_eq!(
            settings.product_catalog,
            Some(PathBuf::from("/etc/mailsetup/providers.xml"))
        );
        assert!(settings.use_keyring);
        assert_eq!(settings.credential_vault(), CredentialVault::Keyring);
    }

    #[test]
    fn test_catalog_layering() {
        let settings = Settings {
            vendor_catalog: Some(PathBuf::from("vendor.xml")),
            ..Settings::default()
        };
        let catalog = settings.provider_catalog();
        assert_eq!(catalog.sources().len(), 2);
        assert_eq!(catalog.sources()[0], CatalogSource::File(PathBuf::from("vendor.xml")));
        assert_eq!(catalog.sources()[1], CatalogSource::builtin());
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/mailsetup/settings.json"))
            .await
            .unwrap();
        assert_eq!(settings, Settings::default());
    }
}
