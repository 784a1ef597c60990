//! Server hostname guessing for manual setup.

/// Which side of the account a hostname is being guessed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole<'a> {
    /// Incoming server, with the prefix to use (e.g. `imap`, `pop3`).
    Incoming(&'a str),
    /// Outgoing server, with the prefix to use (e.g. `smtp`).
    Outgoing(&'a str),
}

impl ServerRole<'_> {
    const fn prefix(&self) -> &str {
        match self {
            Self::Incoming(prefix) | Self::Outgoing(prefix) => prefix,
        }
    }
}

/// Guesses a server hostname from a domain or a partially typed hostname.
///
/// A leading `mail.` label is kept as is. A leading protocol label that fits
/// the role (`imap`, `pop3`, `pop` for incoming; `smtp` for outgoing) is kept,
/// one for the opposite role is swapped for `prefix`, and anything else gets
/// `prefix.` prepended.
///
/// # Examples
///
/// ```
/// use mailsetup_provider::{ServerRole, infer_server_name};
///
/// assert_eq!(infer_server_name("example.com", ServerRole::Incoming("imap")), "imap.example.com");
/// assert_eq!(infer_server_name("imap.example.com", ServerRole::Outgoing("smtp")), "smtp.example.com");
/// assert_eq!(infer_server_name("mail.example.com", ServerRole::Outgoing("smtp")), "mail.example.com");
/// ```
#[must_use]
pub fn infer_server_name(server: &str, role: ServerRole<'_>) -> String {
    let mut keep_from = 0;

    if let Some(first_dot) = server.find('.') {
        let first_label = server[..first_dot].to_lowercase();
        let is_imap_or_pop = matches!(first_label.as_str(), "imap" | "pop3" | "pop");
        let is_smtp = first_label == "smtp";
        let is_mail = first_label == "mail";

        match role {
            ServerRole::Incoming(_) => {
                if is_imap_or_pop || is_mail {
                    return server.to_string();
                }
                if is_smtp {
                    keep_from = first_dot + 1;
                }
            }
            ServerRole::Outgoing(_) => {
                if is_smtp || is_mail {
                    return server.to_string();
                }
                if is_imap_or_pop {
                    keep_from = first_dot + 1;
                }
            }
        }
    }

    format!("{}.{}", role.prefix(), &server[keep_from..])
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
    fn test_bare_domain_gets_prefix() {
        assert_eq!(
            infer_server_name("example.com", ServerRole::Incoming("pop3")),
            "pop3.example.com"
        );
        assert_eq!(
            infer_server_name("example.com", ServerRole::Outgoing("smtp")),
            "smtp.example.com"
        );
    }

    #[test]
    fn test_incoming_keeps_matching_label() {
        assert_eq!(
            infer_server_name("pop.example.com", ServerRole::Incoming("imap")),
            "pop.example.com"
        );
        assert_eq!(
            infer_server_name("IMAP.example.com", ServerRole::Incoming("imap")),
            "IMAP.example.com"
        );
    }

    #[test]
    fn test_incoming_replaces_smtp() {
        assert_eq!(
            infer_server_name("smtp.example.com", ServerRole::Incoming("imap")),
            "imap.example.com"
        );
    }

    #[test]
    fn test_outgoing_replaces_incoming_label() {
        assert_eq!(
            infer_server_name("pop3.example.com", ServerRole::Outgoing("smtp")),
            "smtp.example.com"
        );
    }

    #[test]
    fn test_mail_label_kept_both_ways() {
        assert_eq!(
            infer_server_name("mail.example.com", ServerRole::Incoming("imap")),
            "mail.example.com"
        );
        assert_eq!(
            infer_server_name("mail.example.com", ServerRole::Outgoing("smtp")),
            "mail.example.com"
        );
    }

    #[test]
    fn test_single_label() {
        assert_eq!(
            infer_server_name("localhost", ServerRole::Incoming("imap")),
            "imap.localhost"
        );
    }
}
