//! Report orchestrator for one unattended batch run.
//!
//! The orchestrator sequences a run end to end:
//! - **Collect**: unprocessed work items -> ticket contexts -> report users
//! - **Generate**: directory lookup, appliance job, artifact on disk (one user at a time)
//! - **Reconcile**: claim, attach and accept per ticket group, then mark work items processed

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::ReportOrchestrator;
pub use types::{OrchestratorError, RunInput, RunSummary};
