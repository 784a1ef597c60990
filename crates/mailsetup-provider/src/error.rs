//! Error types for provider catalog operations.

use std::io;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Provider catalog error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider domain pattern is malformed (more than one `*`).
    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    /// A catalog could not be read or parsed.
    #[error("Catalog {source_name} unavailable: {reason}")]
    CatalogUnavailable {
        /// Which catalog failed (file path or embedded name).
        source_name: String,
        /// Why it failed.
        reason: String,
    },

    /// XML deserialization error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates a catalog-unavailable error.
    #[must_use]
    pub fn catalog_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::CatalogUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
