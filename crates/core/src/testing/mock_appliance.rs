//! Mock report appliance for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::RwLock;

use super::CallLog;
use crate::appliance::{
    substitute_account, ApplianceError, ArtifactPayload, JobId, LayoutId, ReportAppliance,
    ReportState, SessionToken,
};
use crate::config::DatasetSpec;
use crate::report::ReportWindow;

/// Appliance operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplianceOp {
    Authenticate,
    ResolveLayout,
    UpdateDatasets,
    SubmitJob,
    ReportState,
    Download,
}

/// A recorded appliance call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplianceCall {
    Authenticate {
        user: String,
    },
    ResolveLayout {
        report_name: String,
    },
    UpdateDatasets {
        account_id: String,
        /// (dataset name, query after substitution)
        queries: Vec<(String, String)>,
    },
    SubmitJob {
        device: String,
        period_start: String,
        period_end: String,
        layout: LayoutId,
    },
    ReportState {
        job: String,
    },
    Download {
        job: String,
    },
}

/// Mock implementation of the ReportAppliance trait.
///
/// Provides controllable behavior for testing:
/// - Scripted job states (anything after the script is `generated`)
/// - Layout catalog and artifact payload
/// - One-shot failure injection per operation
/// - Recorded calls, optionally into a shared [`CallLog`]
///
/// # Example
///
/// ```rust,ignore
/// use fazreport_core::testing::MockAppliance;
///
/// let appliance = MockAppliance::new();
/// appliance.set_states(&["pending", "running", "generated"]).await;
///
/// // ... run the orchestrator ...
///
/// let calls = appliance.recorded_calls().await;
/// ```
#[derive(Debug, Clone)]
pub struct MockAppliance {
    calls: Arc<RwLock<Vec<ApplianceCall>>>,
    log: CallLog,
    layouts: Arc<RwLock<Vec<(String, LayoutId)>>>,
    states: Arc<RwLock<VecDeque<String>>>,
    payload: Arc<RwLock<ArtifactPayload>>,
    next_error: Arc<RwLock<Option<(ApplianceOp, ApplianceError)>>>,
    next_job: Arc<AtomicU64>,
}

impl Default for MockAppliance {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAppliance {
    /// Name of the layout the mock knows by default.
    pub const DEFAULT_LAYOUT: &'static str = "User Activity";
    pub const DEFAULT_LAYOUT_ID: LayoutId = 7;

    /// Create a new mock appliance.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            log: CallLog::new(),
            layouts: Arc::new(RwLock::new(vec![(
                Self::DEFAULT_LAYOUT.to_string(),
                Self::DEFAULT_LAYOUT_ID,
            )])),
            states: Arc::new(RwLock::new(VecDeque::new())),
            payload: Arc::new(RwLock::new(payload_for(b"PK\x03\x04mock report"))),
            next_error: Arc::new(RwLock::new(None)),
            next_job: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Record calls into a shared log as well.
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<ApplianceCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls matching `op`.
    pub async fn call_count(&self, op: ApplianceOp) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| call_op(c) == op)
            .count()
    }

    /// Script the states returned by successive state checks.
    pub async fn set_states(&self, states: &[&str]) {
        *self.states.write().await = states.iter().map(|s| s.to_string()).collect();
    }

    /// Replace the known layouts.
    pub async fn set_layouts(&self, layouts: &[(&str, LayoutId)]) {
        *self.layouts.write().await = layouts
            .iter()
            .map(|(title, id)| (title.to_string(), *id))
            .collect();
    }

    /// Payload returned by every download.
    pub async fn set_payload(&self, payload: ArtifactPayload) {
        *self.payload.write().await = payload;
    }

    /// Configure the next call of `op` to fail with the given error.
    pub async fn set_next_error(&self, op: ApplianceOp, error: ApplianceError) {
        *self.next_error.write().await = Some((op, error));
    }

    async fn record(&self, call: ApplianceCall) {
        self.log.push(format!("appliance:{}", describe(&call))).await;
        self.calls.write().await.push(call);
    }

    async fn take_error(&self, op: ApplianceOp) -> Option<ApplianceError> {
        let mut slot = self.next_error.write().await;
        match slot.as_ref() {
            Some((target, _)) if *target == op => slot.take().map(|(_, e)| e),
            _ => None,
        }
    }
}

/// A payload whose MD5 matches `bytes`.
pub fn payload_for(bytes: &[u8]) -> ArtifactPayload {
    ArtifactPayload {
        data: STANDARD.encode(bytes),
        md5: Some(format!("{:x}", md5::compute(bytes))),
    }
}

fn call_op(call: &ApplianceCall) -> ApplianceOp {
    match call {
        ApplianceCall::Authenticate { .. } => ApplianceOp::Authenticate,
        ApplianceCall::ResolveLayout { .. } => ApplianceOp::ResolveLayout,
        ApplianceCall::UpdateDatasets { .. } => ApplianceOp::UpdateDatasets,
        ApplianceCall::SubmitJob { .. } => ApplianceOp::SubmitJob,
        ApplianceCall::ReportState { .. } => ApplianceOp::ReportState,
        ApplianceCall::Download { .. } => ApplianceOp::Download,
    }
}

fn describe(call: &ApplianceCall) -> String {
    match call {
        ApplianceCall::Authenticate { user } => format!("authenticate {}", user),
        ApplianceCall::ResolveLayout { report_name } => format!("layout {}", report_name),
        ApplianceCall::UpdateDatasets { account_id, .. } => format!("datasets {}", account_id),
        ApplianceCall::SubmitJob { period_start, .. } => format!("submit {}", period_start),
        ApplianceCall::ReportState { job } => format!("state {}", job),
        ApplianceCall::Download { job } => format!("download {}", job),
    }
}

#[async_trait]
impl ReportAppliance for MockAppliance {
    async fn authenticate(
        &self,
        user: &str,
        _password: &str,
    ) -> Result<SessionToken, ApplianceError> {
        self.record(ApplianceCall::Authenticate {
            user: user.to_string(),
        })
        .await;
        if let Some(err) = self.take_error(ApplianceOp::Authenticate).await {
            return Err(err);
        }
        Ok(SessionToken::new("mock-session"))
    }

    async fn resolve_layout(
        &self,
        _session: &SessionToken,
        _adom: &str,
        report_name: &str,
    ) -> Result<LayoutId, ApplianceError> {
        self.record(ApplianceCall::ResolveLayout {
            report_name: report_name.to_string(),
        })
        .await;
        if let Some(err) = self.take_error(ApplianceOp::ResolveLayout).await {
            return Err(err);
        }
        self.layouts
            .read()
            .await
            .iter()
            .find(|(title, _)| title == report_name)
            .map(|(_, id)| *id)
            .ok_or_else(|| ApplianceError::LayoutNotFound(report_name.to_string()))
    }

    async fn update_datasets(
        &self,
        _session: &SessionToken,
        _adom: &str,
        account_id: &str,
        datasets: &[DatasetSpec],
    ) -> Result<(), ApplianceError> {
        self.record(ApplianceCall::UpdateDatasets {
            account_id: account_id.to_string(),
            queries: datasets
                .iter()
                .map(|ds| (ds.name.clone(), substitute_account(&ds.query, account_id)))
                .collect(),
        })
        .await;
        match self.take_error(ApplianceOp::UpdateDatasets).await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn submit_job(
        &self,
        _session: &SessionToken,
        _adom: &str,
        device: &str,
        window: &ReportWindow,
        layout: LayoutId,
    ) -> Result<JobId, ApplianceError> {
        self.record(ApplianceCall::SubmitJob {
            device: device.to_string(),
            period_start: window.appliance_start(),
            period_end: window.appliance_end(),
            layout,
        })
        .await;
        if let Some(err) = self.take_error(ApplianceOp::SubmitJob).await {
            return Err(err);
        }
        let n = self.next_job.fetch_add(1, Ordering::SeqCst);
        Ok(JobId(format!("tid-{}", n)))
    }

    async fn report_state(
        &self,
        _session: &SessionToken,
        _adom: &str,
        job: &JobId,
    ) -> Result<ReportState, ApplianceError> {
        self.record(ApplianceCall::ReportState { job: job.0.clone() })
            .await;
        if let Some(err) = self.take_error(ApplianceOp::ReportState).await {
            return Err(err);
        }
        let raw = self
            .states
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| "generated".to_string());
        ReportState::parse(&raw).ok_or(ApplianceError::UnrecognizedState(raw))
    }

    async fn download_artifact(
        &self,
        _session: &SessionToken,
        _adom: &str,
        job: &JobId,
    ) -> Result<ArtifactPayload, ApplianceError> {
        self.record(ApplianceCall::Download { job: job.0.clone() })
            .await;
        if let Some(err) = self.take_error(ApplianceOp::Download).await {
            return Err(err);
        }
        Ok(self.payload.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_states_then_generated() {
        let appliance = MockAppliance::new();
        appliance.set_states(&["pending", "running"]).await;
        let session = SessionToken::new("s");
        let job = JobId("tid-1".to_string());

        assert_eq!(
            appliance.report_state(&session, "root", &job).await.unwrap(),
            ReportState::Pending
        );
        assert_eq!(
            appliance.report_state(&session, "root", &job).await.unwrap(),
            ReportState::Running
        );
        assert_eq!(
            appliance.report_state(&session, "root", &job).await.unwrap(),
            ReportState::Generated
        );
        assert_eq!(appliance.call_count(ApplianceOp::ReportState).await, 3);
    }

    #[tokio::test]
    async fn test_error_targets_operation() {
        let appliance = MockAppliance::new();
        appliance
            .set_next_error(ApplianceOp::Download, ApplianceError::EmptyResult("report data"))
            .await;

        // Other operations are unaffected.
        assert!(appliance.authenticate("u", "p").await.is_ok());

        let session = SessionToken::new("s");
        let job = JobId("tid-1".to_string());
        assert!(appliance.download_artifact(&session, "root", &job).await.is_err());
        assert!(appliance.download_artifact(&session, "root", &job).await.is_ok());
    }
}
