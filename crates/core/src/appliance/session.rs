//! One authenticated appliance session and the per-user report sequence.

use std::sync::Arc;

use tracing::{debug, info};

use super::{
    wait_until_generated, ApplianceError, ArtifactPayload, LayoutId, PollPolicy,
    ReportAppliance, SessionToken, Sleeper,
};
use crate::config::{ApplianceConfig, DatasetSpec};
use crate::report::ReportWindow;

/// Everything needed to open a session and run jobs in it.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub user: String,
    pub password: String,
    pub adom: String,
    pub device: String,
    pub report_name: String,
    pub datasets: Vec<DatasetSpec>,
    pub poll: PollPolicy,
}

impl From<&ApplianceConfig> for ReportSettings {
    fn from(config: &ApplianceConfig) -> Self {
        Self {
            user: config.user.clone(),
            password: config.password.clone(),
            adom: config.adom.clone(),
            device: config.device.clone(),
            report_name: config.report_name.clone(),
            datasets: config.datasets.clone(),
            poll: PollPolicy::from(&config.polling),
        }
    }
}

/// An authenticated session with the report layout already resolved.
pub struct ReportSession {
    appliance: Arc<dyn ReportAppliance>,
    sleeper: Arc<dyn Sleeper>,
    settings: ReportSettings,
    token: SessionToken,
    layout: LayoutId,
}

impl ReportSession {
    /// Authenticate and resolve the configured layout.
    pub async fn open(
        appliance: Arc<dyn ReportAppliance>,
        sleeper: Arc<dyn Sleeper>,
        settings: ReportSettings,
    ) -> Result<Self, ApplianceError> {
        let token = appliance
            .authenticate(&settings.user, &settings.password)
            .await?;
        let layout = appliance
            .resolve_layout(&token, &settings.adom, &settings.report_name)
            .await?;
        info!(
            adom = %settings.adom,
            report = %settings.report_name,
            layout,
            "Appliance session opened"
        );

        Ok(Self {
            appliance,
            sleeper,
            settings,
            token,
            layout,
        })
    }

    pub fn layout(&self) -> LayoutId {
        self.layout
    }

    /// Parameterize the datasets for `account_id`, run a job for `window`,
    /// wait for it, and download the result.
    pub async fn generate(
        &self,
        account_id: &str,
        window: &ReportWindow,
    ) -> Result<ArtifactPayload, ApplianceError> {
        let s = &self.settings;

        self.appliance
            .update_datasets(&self.token, &s.adom, account_id, &s.datasets)
            .await?;

        let job = self
            .appliance
            .submit_job(&self.token, &s.adom, &s.device, window, self.layout)
            .await?;
        debug!(job = %job, account = %account_id, "Report job submitted");

        let waited = wait_until_generated(
            self.appliance.as_ref(),
            self.sleeper.as_ref(),
            &s.poll,
            &self.token,
            &s.adom,
            &job,
        )
        .await?;
        debug!(job = %job, waited_secs = waited.as_secs(), "Report generated");

        self.appliance
            .download_artifact(&self.token, &s.adom, &job)
            .await
    }
}
