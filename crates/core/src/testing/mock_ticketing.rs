//! Mock ticketing system for testing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CallLog;
use crate::ticketing::{TicketKeys, TicketingError, TicketingSystem};

/// Ticketing operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketingOp {
    Fetch,
    Claim,
    AttachAndAccept,
}

/// A recorded ticketing call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketingCall {
    Fetch {
        task_id: String,
    },
    Claim {
        ticket_id: String,
    },
    AttachAndAccept {
        ticket_id: String,
        resolution_text: String,
        artifacts: Vec<PathBuf>,
    },
}

/// Mock implementation of the TicketingSystem trait.
///
/// Tasks are registered with [`MockTicketing::add_task`]; fetching an unknown
/// task fails with HTTP 404.
///
/// # Example
///
/// ```rust,ignore
/// use fazreport_core::testing::MockTicketing;
///
/// let ticketing = MockTicketing::new();
/// ticketing.add_task("task-1", "T1", "S1", &markup).await;
///
/// // ... run the orchestrator ...
///
/// assert_eq!(ticketing.claimed_tickets().await, vec!["T1"]);
/// ```
#[derive(Debug, Clone)]
pub struct MockTicketing {
    tasks: Arc<RwLock<HashMap<String, TicketKeys>>>,
    calls: Arc<RwLock<Vec<TicketingCall>>>,
    log: CallLog,
    next_error: Arc<RwLock<Option<(TicketingOp, TicketingError)>>>,
}

impl Default for MockTicketing {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTicketing {
    /// Create a new mock ticketing system.
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            log: CallLog::new(),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record calls into a shared log as well.
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Register a task id with the ticket it belongs to.
    pub async fn add_task(
        &self,
        task_id: &str,
        ticket_id: &str,
        sub_request_id: &str,
        markup: &str,
    ) {
        self.tasks.write().await.insert(
            task_id.to_string(),
            TicketKeys {
                ticket_id: ticket_id.to_string(),
                sub_request_id: sub_request_id.to_string(),
                sum_description: markup.to_string(),
            },
        );
    }

    /// Configure the next call of `op` to fail with the given error.
    pub async fn set_next_error(&self, op: TicketingOp, error: TicketingError) {
        *self.next_error.write().await = Some((op, error));
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<TicketingCall> {
        self.calls.read().await.clone()
    }

    /// Ticket ids claimed, in order.
    pub async fn claimed_tickets(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                TicketingCall::Claim { ticket_id } => Some(ticket_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// (ticket id, artifacts) for every attach-and-accept call, in order.
    pub async fn accepted(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                TicketingCall::AttachAndAccept {
                    ticket_id,
                    artifacts,
                    ..
                } => Some((ticket_id.clone(), artifacts.clone())),
                _ => None,
            })
            .collect()
    }

    async fn take_error(&self, op: TicketingOp) -> Option<TicketingError> {
        let mut slot = self.next_error.write().await;
        match slot.as_ref() {
            Some((target, _)) if *target == op => slot.take().map(|(_, e)| e),
            _ => None,
        }
    }
}

#[async_trait]
impl TicketingSystem for MockTicketing {
    async fn fetch_sum_description_and_keys(
        &self,
        task_id: &str,
    ) -> Result<TicketKeys, TicketingError> {
        self.calls.write().await.push(TicketingCall::Fetch {
            task_id: task_id.to_string(),
        });
        self.log.push(format!("ticketing:fetch {}", task_id)).await;
        if let Some(err) = self.take_error(TicketingOp::Fetch).await {
            return Err(err);
        }
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| TicketingError::Http {
                operation: "getData",
                status: 404,
                body: format!("unknown task {}", task_id),
            })
    }

    async fn claim_ticket(&self, ticket_id: &str) -> Result<(), TicketingError> {
        self.calls.write().await.push(TicketingCall::Claim {
            ticket_id: ticket_id.to_string(),
        });
        self.log.push(format!("ticketing:claim {}", ticket_id)).await;
        match self.take_error(TicketingOp::Claim).await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn attach_artifacts_and_accept(
        &self,
        ticket_id: &str,
        resolution_text: &str,
        artifacts: &[PathBuf],
    ) -> Result<(), TicketingError> {
        self.calls.write().await.push(TicketingCall::AttachAndAccept {
            ticket_id: ticket_id.to_string(),
            resolution_text: resolution_text.to_string(),
            artifacts: artifacts.to_vec(),
        });
        self.log.push(format!("ticketing:accept {}", ticket_id)).await;
        if let Some(err) = self.take_error(TicketingOp::AttachAndAccept).await {
            return Err(err);
        }
        for path in artifacts {
            if !path.exists() {
                return Err(TicketingError::Attachment {
                    path: path.display().to_string(),
                    reason: "file does not exist".to_string(),
                });
            }
        }
        Ok(())
    }
}
