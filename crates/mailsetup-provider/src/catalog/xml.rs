//! XML schema for provider catalogs.
//!
//! ```xml
//! <providers>
//!   <provider id="gmail" label="Gmail" domain="gmail.com" oauth="google">
//!     <incoming uri="imap+ssl+://imap.gmail.com" username="$email"/>
//!     <outgoing uri="smtp+ssl+://smtp.gmail.com" username="$email"/>
//!   </provider>
//! </providers>
//! ```

use serde::Deserialize;

use super::provider::Provider;
use crate::error::Result;

#[derive(Debug, Deserialize)]
#[serde(rename = "providers")]
struct ProvidersXml {
    #[serde(rename = "provider", default)]
    providers: Vec<ProviderXml>,
}

#[derive(Debug, Deserialize)]
struct ProviderXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@label", default)]
    label: String,
    #[serde(rename = "@domain")]
    domain: String,
    #[serde(rename = "@note", default)]
    note: Option<String>,
    #[serde(rename = "@oauth", default)]
    oauth: Option<String>,
    incoming: Option<ServerXml>,
    outgoing: Option<ServerXml>,
    #[serde(rename = "incoming-fallback", default)]
    incoming_fallback: Option<ServerXml>,
    #[serde(rename = "outgoing-fallback", default)]
    outgoing_fallback: Option<ServerXml>,
}

#[derive(Debug, Deserialize)]
struct ServerXml {
    #[serde(rename = "@uri")]
    uri: String,
    #[serde(rename = "@username", default)]
    username: String,
}

impl From<ProviderXml> for Provider {
    fn from(xml: ProviderXml) -> Self {
        let (incoming_uri_template, incoming_username_template) = xml
            .incoming
            .map(|s| (s.uri, s.username))
            .unwrap_or_default();
        let (outgoing_uri_template, outgoing_username_template) = xml
            .outgoing
            .map(|s| (s.uri, s.username))
            .unwrap_or_default();
        let (alt_incoming_uri_template, alt_incoming_username_template) = xml
            .incoming_fallback
            .map_or((None, None), |s| (Some(s.uri), Some(s.username)));
        let (alt_outgoing_uri_template, alt_outgoing_username_template) = xml
            .outgoing_fallback
            .map_or((None, None), |s| (Some(s.uri), Some(s.username)));

        Self {
            id: xml.id,
            label: xml.label,
            domain: xml.domain,
            note: xml.note.filter(|n| !n.is_empty()),
            incoming_uri_template,
            incoming_username_template,
            outgoing_uri_template,
            outgoing_username_template,
            alt_incoming_uri_template,
            alt_incoming_username_template,
            alt_outgoing_uri_template,
            alt_outgoing_username_template,
            oauth_provider_id: xml.oauth.filter(|o| !o.is_empty()),
            ..Default::default()
        }
    }
}

/// Parses a provider catalog document, preserving entry order.
pub(crate) fn parse_providers(text: &str) -> Result<Vec<Provider>> {
    let doc: ProvidersXml = quick_xml::de::from_str(text)?;
    Ok(doc.providers.into_iter().map(Provider::from).collect())
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
    fn test_parse_full_entry() {
        let xml = r#"
            <providers>
              <provider id="ex" label="Example" domain="*.example.com" note="Enable IMAP first" oauth="google">
                <incoming uri="imap+ssl+://imap.$domain" username="$email"/>
                <outgoing uri="smtp+tls+://smtp.$domain" username="$user"/>
                <incoming-fallback uri="pop3+ssl+://pop.$domain" username="$user"/>
              </provider>
            </providers>
        "#;
        let providers = parse_providers(xml).unwrap();
        assert_eq!(providers.len(), 1);
        let p = &providers[0];
        assert_eq!(p.id, "ex");
        assert_eq!(p.label, "Example");
        assert_eq!(p.domain, "*.example.com");
        assert_eq!(p.note.as_deref(), Some("Enable IMAP first"));
        assert_eq!(p.oauth_provider_id.as_deref(), Some("google"));
        assert_eq!(p.incoming_uri_template, "imap+ssl+://imap.$domain");
        assert_eq!(p.outgoing_username_template, "$user");
        assert_eq!(
            p.alt_incoming_uri_template.as_deref(),
            Some("pop3+ssl+://pop.$domain")
        );
        assert!(p.alt_outgoing_uri_template.is_none());
    }

    #[test]
    fn test_parse_keeps_order() {
        let xml = r#"
            <providers>
              <provider id="first" domain="a.com"><incoming uri="imap://a" username="$user"/></provider>
              <provider id="second" domain="b.com"><incoming uri="imap://b" username="$user"/></provider>
            </providers>
        "#;
        let ids: Vec<String> = parse_providers(xml)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_parse_empty_catalog() {
        assert!(parse_providers("<providers></providers>").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_providers("<providers><provider").is_err());
    }
}
