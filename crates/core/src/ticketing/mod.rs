//! HD Naumen ticketing: ticket lookup, markup extraction, claim, attach and accept.

mod extract;
mod naumen;
mod types;

pub use extract::{extract_assignees_and_window, ExtractError};
pub use naumen::NaumenClient;
pub use types::{TicketContext, TicketKeys};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the ticketing system.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("ticketing request failed: {0}")]
    Transport(String),

    #[error("ticketing request timed out")]
    Timeout,

    #[error("ticketing {operation} returned HTTP {status}: {body}")]
    Http {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to parse ticketing {operation} response: {reason}")]
    Parse {
        operation: &'static str,
        reason: String,
    },

    #[error("ticketing {operation} response has an empty {field}")]
    EmptyField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("cannot read attachment {path}: {reason}")]
    Attachment { path: String, reason: String },
}

/// Operations used against the ticketing system.
#[async_trait]
pub trait TicketingSystem: Send + Sync {
    /// Look up the ticket a task id belongs to, and the ticket's request text.
    async fn fetch_sum_description_and_keys(
        &self,
        task_id: &str,
    ) -> Result<TicketKeys, TicketingError>;

    /// Take responsibility for a ticket. Claiming an already claimed ticket succeeds.
    async fn claim_ticket(&self, ticket_id: &str) -> Result<(), TicketingError>;

    /// Upload every artifact to the ticket, then move it to "awaiting acceptance"
    /// with `resolution_text`.
    async fn attach_artifacts_and_accept(
        &self,
        ticket_id: &str,
        resolution_text: &str,
        artifacts: &[PathBuf],
    ) -> Result<(), TicketingError>;
}
