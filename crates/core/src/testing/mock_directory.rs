//! Mock directory resolver for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CallLog;
use crate::directory::{DirectoryError, DirectoryResolver};

/// Mock implementation of the DirectoryResolver trait.
///
/// Unknown display names resolve to [`DirectoryError::NoMatch`].
#[derive(Debug, Clone)]
pub struct MockDirectory {
    accounts: Arc<RwLock<HashMap<String, String>>>,
    lookups: Arc<RwLock<Vec<String>>>,
    log: CallLog,
    next_error: Arc<RwLock<Option<DirectoryError>>>,
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDirectory {
    /// Create a new mock directory with no accounts.
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            lookups: Arc::new(RwLock::new(Vec::new())),
            log: CallLog::new(),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record calls into a shared log as well.
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Map a display name to an account id.
    pub async fn add_account(&self, display_name: &str, account_id: &str) {
        self.accounts
            .write()
            .await
            .insert(display_name.to_string(), account_id.to_string());
    }

    /// Configure the next lookup to fail with the given error.
    pub async fn set_next_error(&self, error: DirectoryError) {
        *self.next_error.write().await = Some(error);
    }

    /// Display names looked up, in order.
    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.read().await.clone()
    }
}

#[async_trait]
impl DirectoryResolver for MockDirectory {
    async fn resolve(&self, display_name: &str) -> Result<String, DirectoryError> {
        self.lookups.write().await.push(display_name.to_string());
        self.log.push(format!("directory:resolve {}", display_name)).await;

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        self.accounts
            .read()
            .await
            .get(display_name)
            .cloned()
            .ok_or_else(|| DirectoryError::NoMatch(display_name.to_string()))
    }
}
