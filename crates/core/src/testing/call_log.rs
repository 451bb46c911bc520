//! Shared, ordered log of calls made to several mocks.

use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered list of `"<service>:<operation> <argument>"` entries.
///
/// Give the same log to several mocks to assert on cross-service ordering.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<RwLock<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn push(&self, entry: impl Into<String>) {
        self.entries.write().await.push(entry.into());
    }

    /// All entries in call order.
    pub async fn entries(&self) -> Vec<String> {
        self.entries.read().await.clone()
    }

    /// Position of the first entry starting with `prefix`.
    pub async fn position(&self, prefix: &str) -> Option<usize> {
        self.entries
            .read()
            .await
            .iter()
            .position(|e| e.starts_with(prefix))
    }

    /// Position of the last entry starting with `prefix`.
    pub async fn last_position(&self, prefix: &str) -> Option<usize> {
        self.entries
            .read()
            .await
            .iter()
            .rposition(|e| e.starts_with(prefix))
    }

    /// Number of entries starting with `prefix`.
    pub async fn count(&self, prefix: &str) -> usize {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}
