//! Sleeper that records requested delays and returns immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::appliance::Sleeper;

#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<RwLock<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, in order.
    pub async fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.read().await.clone()
    }

    /// Sum of all requested delays.
    pub async fn total(&self) -> Duration {
        self.sleeps.read().await.iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.write().await.push(duration);
    }
}
