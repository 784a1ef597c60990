//! Provider catalog entries and template expansion.

/// Token replaced by the full email address.
const EMAIL_TOKEN: &str = "$email";
/// Token replaced by the local part of the email address.
const USER_TOKEN: &str = "$user";
/// Token replaced by the domain part of the email address.
const DOMAIN_TOKEN: &str = "$domain";

/// A mail provider entry from a catalog.
///
/// Templates are kept as parsed. The expanded fields stay empty until
/// [`Provider::expand_templates`] is called with the user's address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provider {
    /// Catalog identifier (e.g. `gmail`).
    pub id: String,
    /// Human-readable name.
    pub label: String,
    /// Domain pattern, possibly with `*` and `?` wildcards.
    pub domain: String,
    /// Optional note shown to the user during setup.
    pub note: Option<String>,
    /// Incoming server URI template.
    pub incoming_uri_template: String,
    /// Incoming login template.
    pub incoming_username_template: String,
    /// Outgoing server URI template.
    pub outgoing_uri_template: String,
    /// Outgoing login template.
    pub outgoing_username_template: String,
    /// Fallback incoming server URI template.
    pub alt_incoming_uri_template: Option<String>,
    /// Fallback incoming login template.
    pub alt_incoming_username_template: Option<String>,
    /// Fallback outgoing server URI template.
    pub alt_outgoing_uri_template: Option<String>,
    /// Fallback outgoing login template.
    pub alt_outgoing_username_template: Option<String>,
    /// Identifier of the `OAuth2` provider this mail provider signs in with.
    pub oauth_provider_id: Option<String>,
    /// Expanded incoming URI.
    pub incoming_uri: String,
    /// Expanded incoming login.
    pub incoming_username: String,
    /// Expanded outgoing URI.
    pub outgoing_uri: String,
    /// Expanded outgoing login.
    pub outgoing_username: String,
}

impl Provider {
    /// Fills the expanded URI and login fields from the primary templates.
    ///
    /// Does nothing if `email` has no `@`.
    pub fn expand_templates(&mut self, email: &str) {
        let Some((user, domain)) = split_email(email) else {
            return;
        };
        self.incoming_uri = expand_template(&self.incoming_uri_template, email, user, domain);
        self.incoming_username =
            expand_template(&self.incoming_username_template, email, user, domain);
        self.outgoing_uri = expand_template(&self.outgoing_uri_template, email, user, domain);
        self.outgoing_username =
            expand_template(&self.outgoing_username_template, email, user, domain);
    }

    /// Fills the expanded fields from the fallback templates.
    ///
    /// Returns `false`, leaving the fields untouched, when the provider has no
    /// fallback incoming template or `email` has no `@`. Missing fallback
    /// parts reuse the primary templates.
    pub fn expand_alternate_templates(&mut self, email: &str) -> bool {
        let Some(alt_incoming_uri) = self.alt_incoming_uri_template.as_deref() else {
            return false;
        };
        let Some((user, domain)) = split_email(email) else {
            return false;
        };

        let incoming_username = self
            .alt_incoming_username_template
            .as_deref()
            .unwrap_or(&self.incoming_username_template);
        let outgoing_uri = self
            .alt_outgoing_uri_template
            .as_deref()
            .unwrap_or(&self.outgoing_uri_template);
        let outgoing_username = self
            .alt_outgoing_username_template
            .as_deref()
            .unwrap_or(&self.outgoing_username_template);

        self.incoming_uri = expand_template(alt_incoming_uri, email, user, domain);
        self.incoming_username = expand_template(incoming_username, email, user, domain);
        self.outgoing_uri = expand_template(outgoing_uri, email, user, domain);
        self.outgoing_username = expand_template(outgoing_username, email, user, domain);
        true
    }

    /// Whether this provider signs in with `OAuth2`.
    #[must_use]
    pub const fn uses_oauth(&self) -> bool {
        self.oauth_provider_id.is_some()
    }
}

/// Substitutes `$email`, `$user` and `$domain` in a template.
///
/// This is a plain textual replacement.
///
/// # Examples
///
/// ```
/// use mailsetup_provider::expand_template;
///
/// let host = expand_template("imap.$domain", "user@example.com", "user", "example.com");
/// assert_eq!(host, "imap.example.com");
/// ```
#[must_use]
pub fn expand_template(template: &str, email: &str, user: &str, domain: &str) -> String {
    template
        .replace(EMAIL_TOKEN, email)
        .replace(USER_TOKEN, user)
        .replace(DOMAIN_TOKEN, domain)
}

/// Splits an email address into local part and domain at the last `@`.
#[must_use]
pub fn split_email(email: &str) -> Option<(&str, &str)> {
    let email = email.trim();
    email
        .rsplit_once('@')
        .filter(|(user, domain)| !user.is_empty() && !domain.is_empty())
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

    fn sample() -> Provider {
        Provider {
            id: "example".to_string(),
            label: "Example".to_string(),
            domain: "example.com".to_string(),
            incoming_uri_template: "imap+ssl+://imap.$domain".to_string(),
            incoming_username_template: "$email".to_string(),
            outgoing_uri_template: "smtp+ssl+://smtp.$domain".to_string(),
            outgoing_username_template: "$user".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template("imap.$domain", "user@example.com", "user", "example.com"),
            "imap.example.com"
        );
        assert_eq!(
            expand_template("$user+$domain/$email", "a@b.c", "a", "b.c"),
            "a+b.c/a@b.c"
        );
        assert_eq!(expand_template("plain", "a@b.c", "a", "b.c"), "plain");
    }

    #[test]
    fn test_split_email() {
        assert_eq!(split_email("user@example.com"), Some(("user", "example.com")));
        assert_eq!(split_email("we@ird@example.com"), Some(("we@ird", "example.com")));
        assert_eq!(split_email("user"), None);
        assert_eq!(split_email("@example.com"), None);
        assert_eq!(split_email("user@"), None);
    }

    #[test]
    fn test_expand_templates() {
        let mut provider = sample();
        provider.expand_templates("jane@example.com");
        assert_eq!(provider.incoming_uri, "imap+ssl+://imap.example.com");
        assert_eq!(provider.incoming_username, "jane@example.com");
        assert_eq!(provider.outgoing_uri, "smtp+ssl+://smtp.example.com");
        assert_eq!(provider.outgoing_username, "jane");
    }

    #[test]
    fn test_expand_templates_ignores_bad_email() {
        let mut provider = sample();
        provider.expand_templates("not-an-address");
        assert!(provider.incoming_uri.is_empty());
    }

    #[test]
    fn test_expand_alternate_templates() {
        let mut provider = sample();
        assert!(!provider.expand_alternate_templates("jane@example.com"));

        provider.alt_incoming_uri_template = Some("pop3+ssl+://pop.$domain".to_string());
        assert!(provider.expand_alternate_templates("jane@example.com"));
        assert_eq!(provider.incoming_uri, "pop3+ssl+://pop.example.com");
        assert_eq!(provider.incoming_username, "jane@example.com");
        assert_eq!(provider.outgoing_uri, "smtp+ssl+://smtp.example.com");
    }
}
