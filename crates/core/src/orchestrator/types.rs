//! Types for the report orchestrator.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::report::{ReportArtifact, ReportUser};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Work item store error.
    #[error("work item store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Ticketing system error.
    #[error("ticketing error: {0}")]
    Ticketing(#[from] crate::ticketing::TicketingError),

    /// Report appliance error.
    #[error("appliance error: {0}")]
    Appliance(#[from] crate::appliance::ApplianceError),

    /// Directory error other than a missing account.
    #[error("directory error: {0}")]
    Directory(#[from] crate::directory::DirectoryError),

    /// Artifact could not be written.
    #[error("artifact error: {0}")]
    Artifact(#[from] crate::artifact::ArtifactError),

    /// Ticket mode was requested without a ticketing system or store.
    #[error("ticket mode requires {0}")]
    MissingDependency(&'static str),

    /// An artifact's ticket group was never registered.
    #[error("no aggregate group for ticket {ticket_id} / {sub_request_id}")]
    UnregisteredGroup {
        ticket_id: String,
        sub_request_id: String,
    },
}

/// What a run should process.
#[derive(Debug, Clone)]
pub enum RunInput {
    /// Unprocessed work items from the store.
    Tickets,
    /// A prepared user list; no ticketing and no store updates.
    FlatList(Vec<ReportUser>),
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Work items read from the store.
    pub work_items: usize,
    /// Work items whose ticket markup could not be used. They are marked failed.
    pub skipped_work_items: Vec<String>,
    /// Report users derived from the input.
    pub users: usize,
    /// Display names with no directory account.
    pub users_skipped: Vec<String>,
    pub artifacts: Vec<ReportArtifact>,
    /// Tickets claimed during reconciliation.
    pub tickets_claimed: usize,
    /// Work items marked processed.
    pub reconciled_work_items: Vec<String>,
    pub elapsed: Duration,
}
