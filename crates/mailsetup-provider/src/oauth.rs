//! `OAuth2` provider catalog.

use serde::Deserialize;
use url::Url;

use crate::catalog::CatalogSource;
use crate::error::{Error, Result};

/// Built-in `OAuth2` provider catalog shipped with the crate.
pub const BUILTIN_OAUTH_PROVIDERS: &str = include_str!("../data/oauth.xml");

/// `OAuth2` provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthProvider {
    /// Provider identifier referenced from mail provider entries.
    #[serde(rename = "@id")]
    pub id: String,
    /// Provider name (e.g., "Google").
    #[serde(rename = "@label", default)]
    pub label: String,
    /// Authorization endpoint URL.
    #[serde(rename = "@auth_endpoint")]
    pub auth_endpoint: String,
    /// Token endpoint URL.
    #[serde(rename = "@token_endpoint")]
    pub token_endpoint: String,
    /// Refresh endpoint URL.
    #[serde(rename = "@refresh_endpoint", default)]
    pub refresh_endpoint: String,
    /// `response_type` sent with the authorization request.
    #[serde(rename = "@response_type", default = "default_response_type")]
    pub response_type: String,
    /// Redirect URI registered with the provider.
    #[serde(rename = "@redirect_uri", default)]
    pub redirect_uri: String,
    /// Space-separated scopes.
    #[serde(rename = "@scope", default)]
    pub scope: String,
    /// Opaque state value echoed back by the provider.
    #[serde(rename = "@state", default)]
    pub state: String,
    /// Client identifier.
    #[serde(rename = "@client_id")]
    pub client_id: String,
    /// Client secret (empty for public clients).
    #[serde(rename = "@client_secret", default)]
    pub client_secret: String,
}

fn default_response_type() -> String {
    "code".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename = "providers")]
struct OAuthProvidersXml {
    #[serde(rename = "provider", default)]
    providers: Vec<OAuthProvider>,
}

impl CatalogSource {
    /// The built-in `OAuth2` provider catalog.
    #[must_use]
    pub const fn builtin_oauth() -> Self {
        Self::Embedded {
            name: "builtin-oauth",
            text: BUILTIN_OAUTH_PROVIDERS,
        }
    }
}

impl OAuthProvider {
    /// Validates that the endpoints are well-formed URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{}: client_id is empty",
                self.id
            )));
        }
        Url::parse(&self.auth_endpoint)?;
        Url::parse(&self.token_endpoint)?;
        if !self.refresh_endpoint.is_empty() {
            Url::parse(&self.refresh_endpoint)?;
        }
        Ok(())
    }

    /// Builds the authorization URL the user is sent to in a browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization endpoint is not a valid URL.
    pub fn authorization_url(&self, login_hint: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.auth_endpoint)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("response_type", &self.response_type)
                .append_pair("client_id", &self.client_id);

            if !self.redirect_uri.is_empty() {
                pairs.append_pair("redirect_uri", &self.redirect_uri);
            }
            if !self.scope.is_empty() {
                pairs.append_pair("scope", &self.scope);
            }
            if !self.state.is_empty() {
                pairs.append_pair("state", &self.state);
            }
            if let Some(hint) = login_hint {
                pairs.append_pair("login_hint", hint);
            }
        }

        Ok(url)
    }
}

/// Loads every `OAuth2` provider from `source`, in catalog order.
///
/// The first entry is the default choice.
///
/// # Errors
///
/// Returns [`Error::CatalogUnavailable`] if the source cannot be read or parsed.
pub fn load_oauth_providers(source: &CatalogSource) -> Result<Vec<OAuthProvider>> {
    let text = source.read()?;
    let doc: OAuthProvidersXml = quick_xml::de::from_str(&text)
        .map_err(|e| Error::catalog_unavailable(source.name(), e))?;
    Ok(doc.providers)
}

/// Finds the `OAuth2` provider with the given id.
///
/// # Errors
///
/// Returns [`Error::CatalogUnavailable`] if the source cannot be read or parsed.
pub fn find_oauth_provider(source: &CatalogSource, id: &str) -> Result<Option<OAuthProvider>> {
    Ok(load_oauth_providers(source)?
        .into_iter()
        .find(|p| p.id == id))
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
    fn test_builtin_providers() {
        let providers = load_oauth_providers(&CatalogSource::builtin_oauth()).unwrap();
        assert_eq!(providers[0].id, "google");
        assert_eq!(providers[0].label, "Google");
        for p in &providers {
            p.validate().unwrap();
        }
    }

    #[test]
    fn test_find_by_id() {
        let source = CatalogSource::builtin_oauth();
        let outlook = find_oauth_provider(&source, "outlook").unwrap().unwrap();
        assert_eq!(outlook.label, "Microsoft");
        assert!(outlook.scope.contains("offline_access"));
        assert!(find_oauth_provider(&source, "missing").unwrap().is_none());
    }

    #[test]
    fn test_custom_provider() {
        let source = CatalogSource::Inline(
            r#"<providers>
                 <provider id="custom" label="Custom"
                   auth_endpoint="https://auth.example.com/authorize"
                   token_endpoint="https://auth.example.com/token"
                   client_id="abc"/>
               </providers>"#
                .to_string(),
        );
        let providers = load_oauth_providers(&source).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].response_type, "code");
        providers[0].validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut provider = load_oauth_providers(&CatalogSource::builtin_oauth())
            .unwrap()
            .remove(0);
        provider.token_endpoint = "not a url".to_string();
        assert!(matches!(provider.validate(), Err(Error::Url(_))));

        provider.client_id.clear();
        assert!(matches!(provider.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_authorization_url() {
        let provider = find_oauth_provider(&CatalogSource::builtin_oauth(), "google")
            .unwrap()
            .unwrap();
        let url = provider.authorization_url(Some("jane@gmail.com")).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("client_id".to_string(), provider.client_id.clone())));
        assert!(pairs.contains(&("login_hint".to_string(), "jane@gmail.com".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "https://mail.google.com/".to_string())));
    }

    #[test]
    fn test_unreadable_catalog() {
        let source = CatalogSource::Inline("<providers><provider id=".to_string());
        assert!(matches!(
            load_oauth_providers(&source),
            Err(Error::CatalogUnavailable { .. })
        ));
    }
}
