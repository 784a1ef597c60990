//! Layered provider catalog lookup.
//!
//! A [`ProviderCatalog`] holds an ordered list of [`CatalogSource`]s,
//! normally vendor overrides, then product overrides, then the built-in
//! catalog. Every lookup reads and parses the sources again; nothing is cached.

mod provider;
mod xml;

use std::path::PathBuf;

use tracing::{debug, warn};

pub use provider::{Provider, expand_template, split_email};

use crate::error::{Error, Result};
use crate::matcher::matches_domain;

/// Built-in provider catalog shipped with the crate.
pub const BUILTIN_PROVIDERS: &str = include_str!("../../data/providers.xml");

/// Where a catalog's XML text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Text compiled into the binary.
    Embedded {
        /// Name used in log messages.
        name: &'static str,
        /// Catalog XML.
        text: &'static str,
    },
    /// A file on disk, read on every lookup.
    File(PathBuf),
    /// Text supplied at runtime.
    Inline(String),
}

impl CatalogSource {
    /// The built-in provider catalog.
    #[must_use]
    pub const fn builtin() -> Self {
        Self::Embedded {
            name: "builtin",
            text: BUILTIN_PROVIDERS,
        }
    }

    /// Name used in log messages and errors.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Embedded { name, .. } => (*name).to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Inline(_) => "inline".to_string(),
        }
    }

    /// Reads the catalog text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogUnavailable`] if a file source cannot be read.
    pub fn read(&self) -> Result<String> {
        match self {
            Self::Embedded { text, .. } => Ok((*text).to_string()),
            Self::File(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::catalog_unavailable(self.name(), e)),
            Self::Inline(text) => Ok(text.clone()),
        }
    }

    /// Reads and parses the provider entries of this source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogUnavailable`] if the source cannot be read or parsed.
    pub fn load(&self) -> Result<Vec<Provider>> {
        let text = self.read()?;
        xml::parse_providers(&text).map_err(|e| Error::catalog_unavailable(self.name(), e))
    }
}

/// Ordered set of provider catalogs.
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    sources: Vec<CatalogSource>,
}

impl ProviderCatalog {
    /// Creates an empty catalog with no sources.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Creates the standard layering: vendor, product, then built-in.
    #[must_use]
    pub fn layered(vendor: Option<CatalogSource>, product: Option<CatalogSource>) -> Self {
        let sources = vendor
            .into_iter()
            .chain(product)
            .chain(std::iter::once(CatalogSource::builtin()))
            .collect();
        Self { sources }
    }

    /// Appends a source. Sources are queried in insertion order.
    #[must_use]
    pub fn with_source(mut self, source: CatalogSource) -> Self {
        self.sources.push(source);
        self
    }

    /// The sources in query order.
    #[must_use]
    pub fn sources(&self) -> &[CatalogSource] {
        &self.sources
    }

    /// Finds the first provider whose domain pattern matches `domain`.
    ///
    /// Sources are queried in order and the first source with a match wins.
    /// Unreadable sources and entries with malformed patterns are logged and
    /// skipped. The returned provider's templates are not yet expanded.
    #[must_use]
    pub fn find_provider_for_domain(&self, domain: &str) -> Option<Provider> {
        self.sources.iter().find_map(|source| {
            match find_in_source(source, domain) {
                Ok(found) => found,
                Err(e) => {
                    warn!("Skipping provider catalog: {e}");
                    None
                }
            }
        })
    }

    /// Finds the provider for an email address and expands its templates.
    #[must_use]
    pub fn find_provider_for_email(&self, email: &str) -> Option<Provider> {
        let (_, domain) = split_email(email)?;
        let mut provider = self.find_provider_for_domain(domain)?;
        provider.expand_templates(email);
        Some(provider)
    }
}

/// Scans one source for the first entry matching `domain`.
fn find_in_source(source: &CatalogSource, domain: &str) -> Result<Option<Provider>> {
    let providers = source.load()?;
    Ok(find_in_entries(providers, domain, &source.name()))
}

fn find_in_entries(providers: Vec<Provider>, domain: &str, source_name: &str) -> Option<Provider> {
    for provider in providers {
        match matches_domain(domain, &provider.domain) {
            Ok(true) => {
                debug!(
                    "Matched {domain} to provider {} in {source_name}",
                    provider.id
                );
                return Some(provider);
            }
            Ok(false) => {}
            Err(e) => warn!("Skipping provider {} in {source_name}: {e}", provider.id),
        }
    }
    None
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

    fn inline(entries: &str) -> CatalogSource {
        CatalogSource::Inline(format!("<providers>{entries}</providers>"))
    }

    fn entry(id: &str, domain: &str) -> String {
        format!(
            r#"<provider id="{id}" label="{id}" domain="{domain}">
                 <incoming uri="imap+ssl+://imap.{id}.test" username="$email"/>
                 <outgoing uri="smtp+ssl+://smtp.{id}.test" username="$email"/>
               </provider>"#
        )
    }

    #[test]
    fn test_builtin_catalog_parses() {
        let providers = CatalogSource::builtin().load().unwrap();
        assert!(providers.iter().any(|p| p.id == "gmail"));
        for p in &providers {
            assert!(!p.incoming_uri_template.is_empty(), "{} has no incoming", p.id);
        }
    }

    #[test]
    fn test_builtin_lookup() {
        let catalog = ProviderCatalog::layered(None, None);
        let gmail = catalog.find_provider_for_domain("GMAIL.com").unwrap();
        assert_eq!(gmail.id, "gmail");
        assert_eq!(gmail.oauth_provider_id.as_deref(), Some("google"));

        let yahoo = catalog.find_provider_for_domain("yahoo.co.uk").unwrap();
        assert_eq!(yahoo.id, "yahoo");

        assert!(catalog.find_provider_for_domain("unknown.example").is_none());
    }

    #[test]
    fn test_product_overrides_builtin() {
        let product = inline(&entry("corp-gmail", "gmail.com"));
        let catalog = ProviderCatalog::layered(None, Some(product));
        let found = catalog.find_provider_for_domain("gmail.com").unwrap();
        assert_eq!(found.id, "corp-gmail");
    }

    #[test]
    fn test_vendor_overrides_product() {
        let vendor = inline(&entry("vendor", "example.com"));
        let product = inline(&entry("product", "example.com"));
        let catalog = ProviderCatalog::layered(Some(vendor), Some(product));
        assert_eq!(
            catalog.find_provider_for_domain("example.com").unwrap().id,
            "vendor"
        );
    }

    #[test]
    fn test_first_entry_wins_within_source() {
        let source = inline(&format!(
            "{}{}",
            entry("broad", "*.example.com"),
            entry("narrow", "mail.example.com")
        ));
        let catalog = ProviderCatalog::new().with_source(source);
        assert_eq!(
            catalog.find_provider_for_domain("mail.example.com").unwrap().id,
            "broad"
        );
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let source = inline(&format!(
            "{}{}",
            entry("bad", "*.example.*"),
            entry("good", "*.example.com")
        ));
        let catalog = ProviderCatalog::new().with_source(source);
        assert_eq!(
            catalog.find_provider_for_domain("mail.example.com").unwrap().id,
            "good"
        );
    }

    #[test]
    fn test_unavailable_source_skipped() {
        let catalog = ProviderCatalog::new()
            .with_source(CatalogSource::File(PathBuf::from(
                "/nonexistent/mailsetup/providers.xml",
            )))
            .with_source(CatalogSource::Inline("<providers><provider".to_string()))
            .with_source(inline(&entry("fallback", "example.com")));
        assert_eq!(
            catalog.find_provider_for_domain("example.com").unwrap().id,
            "fallback"
        );
    }

    #[test]
    fn test_unavailable_only_source_is_not_found() {
        let catalog = ProviderCatalog::new().with_source(CatalogSource::File(PathBuf::from(
            "/nonexistent/mailsetup/providers.xml",
        )));
        assert!(catalog.find_provider_for_domain("example.com").is_none());
    }

    #[test]
    fn test_file_read_error_is_catalog_unavailable() {
        let err = CatalogSource::File(PathBuf::from("/nonexistent/x.xml"))
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable { .. }));
    }

    #[test]
    fn test_find_provider_for_email_expands() {
        let catalog = ProviderCatalog::layered(None, None);
        let provider = catalog.find_provider_for_email("jane@icloud.com").unwrap();
        assert_eq!(provider.incoming_uri, "imap+ssl+://imap.mail.me.com");
        assert_eq!(provider.incoming_username, "jane");
        assert_eq!(provider.outgoing_username, "jane@icloud.com");
        assert!(catalog.find_provider_for_email("no-at-sign").is_none());
    }
}
