//! FortiAnalyzer JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::{NoExpand, Regex};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{
    ApplianceError, ArtifactPayload, JobId, LayoutId, ReportAppliance, ReportState, SessionToken,
};
use crate::config::{ApplianceConfig, DatasetSpec};
use crate::report::ReportWindow;

/// Responses that succeeded carry this status fragment.
static MESSAGE_OK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""message"\s*:\s*"OK""#).expect("status pattern is valid"));

/// `%WORD%` placeholders in dataset queries.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\w+%").expect("placeholder pattern is valid"));

/// Replace every `%WORD%` placeholder in `query` with `account_id`, literally.
pub fn substitute_account(query: &str, account_id: &str) -> String {
    PLACEHOLDER
        .replace_all(query, NoExpand(account_id))
        .into_owned()
}

/// FortiAnalyzer JSON-RPC client.
pub struct FazClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl FazClient {
    /// Create a new client for the configured endpoint.
    pub fn new(config: &ApplianceConfig) -> Result<Self, ApplianceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ApplianceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Post one JSON-RPC request and return the raw body of a 200 response.
    async fn call(
        &self,
        method: &str,
        session: &str,
        params: Value,
    ) -> Result<String, ApplianceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url_param = params.get("url").and_then(Value::as_str).unwrap_or_default();
        trace!(id, method, url = url_param, "FAZ request");

        let body = json!({
            "method": method,
            "params": [params],
            "jsonrpc": "2.0",
            "session": session,
            "id": id,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApplianceError::RequestTimeout
                } else {
                    ApplianceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApplianceError::Transport(e.to_string()))?;

        if status.as_u16() != 200 {
            return Err(ApplianceError::Http {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        Ok(text)
    }

    fn parse(text: &str) -> Result<Value, ApplianceError> {
        serde_json::from_str(text).map_err(|e| ApplianceError::Parse(e.to_string()))
    }

    fn require_ok(text: &str) -> Result<(), ApplianceError> {
        if MESSAGE_OK.is_match(text) {
            Ok(())
        } else {
            Err(ApplianceError::NotOk(excerpt(text)))
        }
    }
}

/// First 200 characters of a response body, for error messages.
fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Status message of a failed login (`result[0].status.message`).
fn status_message(value: &Value) -> Option<&str> {
    value
        .pointer("/result/0/status/message")
        .or_else(|| value.pointer("/result/status/message"))
        .and_then(Value::as_str)
}

#[async_trait]
impl ReportAppliance for FazClient {
    async fn authenticate(
        &self,
        user: &str,
        password: &str,
    ) -> Result<SessionToken, ApplianceError> {
        let params = json!({
            "url": "/sys/login/user",
            "apiver": 3,
            "data": { "user": user, "passwd": password },
        });
        let text = self.call("exec", "1", params).await?;
        let value = Self::parse(&text)?;

        match value.get("session").and_then(Value::as_str) {
            Some(session) if !session.is_empty() => {
                debug!("FAZ login successful");
                Ok(SessionToken::new(session))
            }
            _ => Err(ApplianceError::AuthenticationFailed(
                status_message(&value)
                    .unwrap_or("no session in response")
                    .to_string(),
            )),
        }
    }

    async fn resolve_layout(
        &self,
        session: &SessionToken,
        adom: &str,
        report_name: &str,
    ) -> Result<LayoutId, ApplianceError> {
        let params = json!({
            "url": format!("report/adom/{}/config/layout", adom),
            "apiver": 3,
        });
        let text = self.call("get", session.as_str(), params).await?;
        Self::require_ok(&text)?;
        let value = Self::parse(&text)?;

        let layouts = value
            .pointer("/result/data")
            .and_then(Value::as_array)
            .ok_or_else(|| ApplianceError::Parse("missing result.data".to_string()))?;

        layouts
            .iter()
            .find(|layout| layout.get("title").and_then(Value::as_str) == Some(report_name))
            .and_then(|layout| layout.get("layout-id").and_then(Value::as_i64))
            .ok_or_else(|| ApplianceError::LayoutNotFound(report_name.to_string()))
    }

    async fn update_datasets(
        &self,
        session: &SessionToken,
        adom: &str,
        account_id: &str,
        datasets: &[DatasetSpec],
    ) -> Result<(), ApplianceError> {
        for dataset in datasets {
            let params = json!({
                "url": format!("report/adom/{}/config/dataset/{}", adom, dataset.name),
                "apiver": 3,
                "data": { "query": substitute_account(&dataset.query, account_id) },
            });
            let text = self.call("update", session.as_str(), params).await?;
            Self::require_ok(&text).map_err(|e| ApplianceError::DatasetUpdate {
                dataset: dataset.name.clone(),
                reason: e.to_string(),
            })?;
            debug!(dataset = %dataset.name, "Dataset updated");
        }
        Ok(())
    }

    async fn submit_job(
        &self,
        session: &SessionToken,
        adom: &str,
        device: &str,
        window: &ReportWindow,
        layout: LayoutId,
    ) -> Result<JobId, ApplianceError> {
        let params = json!({
            "url": format!("/report/adom/{}/run", adom),
            "apiver": 3,
            "schedule-param": {
                "device": device,
                "time-period": "other",
                "period-start": window.appliance_start(),
                "period-end": window.appliance_end(),
                "layout-id": layout,
            },
        });
        let text = self.call("add", session.as_str(), params).await?;
        let value = Self::parse(&text)?;

        match value.pointer("/result/tid").and_then(Value::as_str) {
            Some(tid) if !tid.is_empty() => Ok(JobId(tid.to_string())),
            _ => Err(ApplianceError::EmptyResult("job id")),
        }
    }

    async fn report_state(
        &self,
        session: &SessionToken,
        adom: &str,
        job: &JobId,
    ) -> Result<ReportState, ApplianceError> {
        let params = json!({
            "url": format!("/report/adom/{}/run/{}", adom, job),
            "apiver": 3,
        });
        let text = self.call("get", session.as_str(), params).await?;
        let value = Self::parse(&text)?;

        let raw = value
            .pointer("/result/state")
            .and_then(Value::as_str)
            .ok_or_else(|| ApplianceError::UnrecognizedState(excerpt(&text)))?;

        ReportState::parse(raw).ok_or_else(|| ApplianceError::UnrecognizedState(raw.to_string()))
    }

    async fn download_artifact(
        &self,
        session: &SessionToken,
        adom: &str,
        job: &JobId,
    ) -> Result<ArtifactPayload, ApplianceError> {
        let params = json!({
            "url": format!("report/adom/{}/reports/data/{}", adom, job),
            "apiver": 3,
            "format": "PDF",
            "data-type": "text",
        });
        let text = self.call("get", session.as_str(), params).await?;
        let value = Self::parse(&text)?;

        let data = match value.pointer("/result/data").and_then(Value::as_str) {
            Some(data) if !data.is_empty() => data.to_string(),
            _ => return Err(ApplianceError::EmptyResult("report data")),
        };

        let md5 = value.pointer("/result/checksum").and_then(|checksum| {
            let method = checksum.get("method").and_then(Value::as_str)?;
            let hash = checksum.get("hash").and_then(Value::as_str)?;
            (method.eq_ignore_ascii_case("md5") && !hash.is_empty())
                .then(|| hash.to_ascii_lowercase())
        });

        Ok(ArtifactPayload { data, md5 })
    }
}
