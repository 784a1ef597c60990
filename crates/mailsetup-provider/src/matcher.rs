//! Domain wildcard matching.
//!
//! Provider domain patterns use two wildcards:
//! - `*` matches any run of characters, including none. At most one per pattern.
//! - `?` matches exactly one character. Any number per pattern.
//!
//! Matching is case-insensitive and works on the whole string rather than on
//! individual dot-separated labels, so `*.example.com` also matches
//! `a.b.example.com`.

use crate::error::{Error, Result};

/// The global wildcard.
const GLOBAL: char = '*';

/// The single-character wildcard.
const SINGLE: char = '?';

/// Returns whether `domain` matches `pattern`.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] if `pattern` contains more than one `*`.
///
/// # Examples
///
/// ```
/// use mailsetup_provider::matches_domain;
///
/// assert!(matches_domain("mail.example.com", "*.example.com").unwrap());
/// assert!(matches_domain("a1b", "a?b").unwrap());
/// assert!(!matches_domain("ab", "a?b").unwrap());
/// ```
pub fn matches_domain(domain: &str, pattern: &str) -> Result<bool> {
    let domain: Vec<char> = domain.to_lowercase().chars().collect();
    let pattern = pattern.to_lowercase();
    let segments: Vec<Vec<char>> = pattern
        .split(GLOBAL)
        .map(|segment| segment.chars().collect())
        .collect();

    match segments.as_slice() {
        [whole] => Ok(whole.len() == domain.len() && matches_segment(&domain, whole)),
        [prefix, suffix] => {
            if domain.len() < prefix.len() + suffix.len() {
                return Ok(false);
            }
            let tail = &domain[domain.len() - suffix.len()..];
            Ok(matches_segment(&domain[..prefix.len()], prefix) && matches_segment(tail, suffix))
        }
        _ => Err(Error::InvalidPattern(pattern)),
    }
}

/// Compares two equal-length runs, letting `?` in the pattern match anything.
fn matches_segment(text: &[char], pattern: &[char]) -> bool {
    text.len() == pattern.len()
        && text
            .iter()
            .zip(pattern)
            .all(|(t, p)| *p == SINGLE || t == p)
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
    use proptest::prelude::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_domain("example.com", "example.com").unwrap());
        assert!(!matches_domain("example.org", "example.com").unwrap());
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_domain("Mail.EXAMPLE.com", "mail.example.COM").unwrap());
        assert!(matches_domain("MAIL.EXAMPLE.COM", "*.example.com").unwrap());
    }

    #[test]
    fn test_leading_global() {
        assert!(matches_domain("mail.example.com", "*.example.com").unwrap());
        assert!(matches_domain("a.b.example.com", "*.example.com").unwrap());
        assert!(!matches_domain("mail.example.org", "*.example.com").unwrap());
        assert!(!matches_domain("example.com", "*.example.com").unwrap());
    }

    #[test]
    fn test_trailing_global() {
        assert!(matches_domain("yahoo.co.uk", "yahoo.*").unwrap());
        assert!(matches_domain("yahoo.", "yahoo.*").unwrap());
        assert!(!matches_domain("yahoo", "yahoo.*").unwrap());
    }

    #[test]
    fn test_middle_global() {
        assert!(matches_domain("mail.corp.example.com", "mail.*.com").unwrap());
        assert!(!matches_domain("mail.com", "mail.*.com").unwrap());
    }

    #[test]
    fn test_single_wildcard() {
        assert!(matches_domain("a1b", "a?b").unwrap());
        assert!(!matches_domain("ab", "a?b").unwrap());
        assert!(!matches_domain("a12b", "a?b").unwrap());
        assert!(matches_domain("mail1.example.com", "mail?.example.com").unwrap());
    }

    #[test]
    fn test_mixed_wildcards() {
        assert!(matches_domain("x.mail1.example.com", "*.mail?.example.com").unwrap());
        assert!(!matches_domain("x.mail.example.com", "*.mail?.example.com").unwrap());
    }

    #[test]
    fn test_lone_global() {
        assert!(matches_domain("anything.at.all", "*").unwrap());
        assert!(matches_domain("", "*").unwrap());
    }

    #[test]
    fn test_two_globals_rejected() {
        let err = matches_domain("a.b.c", "*.b.*").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn test_candidate_too_short() {
        assert!(!matches_domain("ab", "abc*def").unwrap());
    }

    proptest! {
        #[test]
        fn literal_pattern_is_case_insensitive_equality(
            domain in "[a-zA-Z0-9.-]{0,24}",
            pattern in "[a-zA-Z0-9.-]{0,24}",
        ) {
            prop_assert_eq!(
                matches_domain(&domain, &pattern).unwrap(),
                domain.to_lowercase() == pattern.to_lowercase()
            );
        }

        #[test]
        fn lone_global_matches_every_nonempty_domain(domain in "[a-z0-9.-]{1,40}") {
            prop_assert!(matches_domain(&domain, "*").unwrap());
        }

        #[test]
        fn domain_matches_itself(domain in "[a-zA-Z0-9.-]{0,40}") {
            prop_assert!(matches_domain(&domain, &domain).unwrap());
        }
    }
}
