//! # mailsetup-provider
//!
//! Mail provider knowledge for account setup.
//!
//! ## Features
//!
//! - **Domain matching**: case-insensitive patterns with one `*` and any number of `?`
//! - **Provider catalogs**: layered vendor / product / built-in XML catalogs, first match wins
//! - **Template expansion**: `$email`, `$user` and `$domain` in server URIs and logins
//! - **Server-name inference**: guess `imap.`/`smtp.` hostnames for manual setup
//! - **`OAuth2` catalog**: provider endpoints and authorization URLs
//!
//! ## Quick Start
//!
//! ```
//! use mailsetup_provider::{ProviderCatalog, ServerRole, infer_server_name};
//!
//! let catalog = ProviderCatalog::layered(None, None);
//! if let Some(provider) = catalog.find_provider_for_email("jane@gmail.com") {
//!     assert_eq!(provider.incoming_uri, "imap+ssl+://imap.gmail.com");
//! }
//!
//! let host = infer_server_name("example.com", ServerRole::Outgoing("smtp"));
//! assert_eq!(host, "smtp.example.com");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod catalog;
mod error;
pub mod inference;
pub mod matcher;
pub mod oauth;

pub use catalog::{CatalogSource, Provider, ProviderCatalog, expand_template, split_email};
pub use error::{Error, Result};
pub use inference::{ServerRole, infer_server_name};
pub use matcher::matches_domain;
pub use oauth::{OAuthProvider, find_oauth_provider, load_oauth_providers};
