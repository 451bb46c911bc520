//! Directory lookup of account ids by display name.

mod ldap;

pub use ldap::{build_filter, LdapDirectoryResolver, ACCOUNT_ATTRIBUTE};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Could not connect or authenticate. Fatal to the run.
    #[error("directory bind failed: {0}")]
    Bind(String),

    /// No eligible account carries this display name. The user is skipped.
    #[error("no directory account for '{0}'")]
    NoMatch(String),

    /// The search itself failed. Fatal to the run.
    #[error("directory search failed: {0}")]
    Search(String),
}

/// Resolves a person's display name to their account id.
#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    /// Return the first eligible account id whose display name equals `display_name`.
    async fn resolve(&self, display_name: &str) -> Result<String, DirectoryError>;
}
