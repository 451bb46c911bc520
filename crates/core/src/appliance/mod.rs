//! FortiAnalyzer report appliance: session, layout, datasets, jobs, polling, download.

mod faz;
mod poll;
mod session;
mod types;

pub use faz::{substitute_account, FazClient};
pub use poll::{wait_until_generated, PollPolicy, Sleeper, TokioSleeper};
pub use session::{ReportSession, ReportSettings};
pub use types::{ApplianceError, ArtifactPayload, JobId, LayoutId, ReportState, SessionToken};

use async_trait::async_trait;

use crate::config::DatasetSpec;
use crate::report::ReportWindow;

/// Operations the report appliance exposes.
///
/// Every call after [`ReportAppliance::authenticate`] carries the session it returned.
#[async_trait]
pub trait ReportAppliance: Send + Sync {
    /// Log in and return a session token.
    async fn authenticate(&self, user: &str, password: &str)
        -> Result<SessionToken, ApplianceError>;

    /// Find the layout whose title equals `report_name` exactly.
    async fn resolve_layout(
        &self,
        session: &SessionToken,
        adom: &str,
        report_name: &str,
    ) -> Result<LayoutId, ApplianceError>;

    /// Rewrite every dataset query for `account_id`, in order. Stops at the first failure.
    async fn update_datasets(
        &self,
        session: &SessionToken,
        adom: &str,
        account_id: &str,
        datasets: &[DatasetSpec],
    ) -> Result<(), ApplianceError>;

    /// Start a report job for `window` and return its id.
    async fn submit_job(
        &self,
        session: &SessionToken,
        adom: &str,
        device: &str,
        window: &ReportWindow,
        layout: LayoutId,
    ) -> Result<JobId, ApplianceError>;

    /// Current generation state of a job.
    async fn report_state(
        &self,
        session: &SessionToken,
        adom: &str,
        job: &JobId,
    ) -> Result<ReportState, ApplianceError>;

    /// Download a generated report.
    async fn download_artifact(
        &self,
        session: &SessionToken,
        adom: &str,
        job: &JobId,
    ) -> Result<ArtifactPayload, ApplianceError>;
}
