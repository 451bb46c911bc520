//! LDAP-backed directory resolver.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{ldap_escape, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, warn};

use super::{DirectoryError, DirectoryResolver};
use crate::config::DirectoryConfig;

/// Attribute holding the account id.
pub const ACCOUNT_ATTRIBUTE: &str = "samaccountname";

/// Build the subtree search filter for one display name.
///
/// Accounts whose id starts with `exclusion_prefix` never match.
pub fn build_filter(display_name: &str, exclusion_prefix: &str) -> String {
    format!(
        "(&(objectClass=user)(displayname={})(!({}={}*)))",
        ldap_escape(display_name),
        ACCOUNT_ATTRIBUTE,
        ldap_escape(exclusion_prefix)
    )
}

/// Directory resolver over plain LDAP with a simple bind.
///
/// A fresh connection is opened per lookup; results are not cached.
pub struct LdapDirectoryResolver {
    url: String,
    base_dn: String,
    bind_user: String,
    bind_password: String,
    exclusion_prefix: String,
    timeout: Duration,
}

impl LdapDirectoryResolver {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            url: format!("ldap://{}:{}", config.host, config.port),
            base_dn: config.base_dn.clone(),
            bind_user: config.bind_user.clone(),
            bind_password: config.bind_password.clone(),
            exclusion_prefix: config.exclusion_prefix.clone(),
            timeout: Duration::from_secs(config.timeout_secs as u64),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DirectoryResolver for LdapDirectoryResolver {
    async fn resolve(&self, display_name: &str) -> Result<String, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(|e| DirectoryError::Bind(format!("connect {}: {}", self.url, e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver stopped");
            }
        });

        ldap.with_timeout(self.timeout)
            .simple_bind(&self.bind_user, &self.bind_password)
            .await
            .and_then(|res| res.success())
            .map_err(|e| DirectoryError::Bind(e.to_string()))?;

        let filter = build_filter(display_name, &self.exclusion_prefix);
        debug!(filter = %filter, base_dn = %self.base_dn, "LDAP search");

        let search = ldap
            .with_timeout(self.timeout)
            .search(&self.base_dn, Scope::Subtree, &filter, vec![ACCOUNT_ATTRIBUTE])
            .await
            .and_then(|res| res.success());

        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "LDAP unbind failed");
        }

        let (entries, _) = search.map_err(|e| DirectoryError::Search(e.to_string()))?;

        entries
            .into_iter()
            .map(SearchEntry::construct)
            .find_map(|entry| account_from_attrs(entry.attrs))
            .ok_or_else(|| DirectoryError::NoMatch(display_name.to_string()))
    }
}

/// First value of the account attribute, matched case-insensitively.
fn account_from_attrs(
    attrs: std::collections::HashMap<String, Vec<String>>,
) -> Option<String> {
    attrs
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(ACCOUNT_ATTRIBUTE))
        .and_then(|(_, values)| values.into_iter().next())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_filter() {
        assert_eq!(
            build_filter("Иван Петрович Сидоров", "PAM-"),
            "(&(objectClass=user)(displayname=Иван Петрович Сидоров)(!(samaccountname=PAM-*)))"
        );
    }

    #[test]
    fn test_build_filter_escapes_metacharacters() {
        let filter = build_filter("Evil*)(cn=*", "PAM-").to_lowercase();
        assert!(filter.contains(r"displayname=evil\2a\29\28cn=\2a"));
        assert!(filter.ends_with("(!(samaccountname=pam-*)))"));
    }

    #[test]
    fn test_account_attribute_case_insensitive() {
        let mut attrs = HashMap::new();
        attrs.insert("sAMAccountName".to_string(), vec!["isidorov".to_string()]);
        assert_eq!(account_from_attrs(attrs), Some("isidorov".to_string()));
    }

    #[test]
    fn test_account_attribute_missing_or_empty() {
        let mut attrs = HashMap::new();
        attrs.insert("cn".to_string(), vec!["x".to_string()]);
        assert_eq!(account_from_attrs(attrs), None);

        let mut attrs = HashMap::new();
        attrs.insert("samaccountname".to_string(), vec![]);
        assert_eq!(account_from_attrs(attrs), None);
    }

    #[test]
    fn test_url_from_config() {
        let config = DirectoryConfig {
            host: "dc01.corp.local".to_string(),
            port: 389,
            base_dn: "DC=corp,DC=local".to_string(),
            bind_user: "svc".to_string(),
            bind_password: "x".to_string(),
            exclusion_prefix: "PAM-".to_string(),
            timeout_secs: 30,
        };
        let resolver = LdapDirectoryResolver::new(&config);
        assert_eq!(resolver.url(), "ldap://dc01.corp.local:389");
    }
}
