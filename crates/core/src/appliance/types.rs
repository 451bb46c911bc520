//! Types shared by report appliance implementations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Appliance session id. Obtained once per run, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Numeric id of a report layout.
pub type LayoutId = i64;

/// Id of a submitted report job (`tid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generation state of a report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Pending,
    Running,
    Generated,
}

impl ReportState {
    /// Parse the appliance's state string. Unknown states yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ReportState::Pending),
            "running" => Some(ReportState::Running),
            "generated" => Some(ReportState::Generated),
            _ => None,
        }
    }
}

/// Downloaded report: base64 text of a zip archive, plus the checksum the
/// appliance reported for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPayload {
    pub data: String,
    /// Lowercase hex MD5 of the decoded archive.
    pub md5: Option<String>,
}

/// Errors from the report appliance.
#[derive(Debug, Error)]
pub enum ApplianceError {
    #[error("appliance request failed: {0}")]
    Transport(String),

    #[error("appliance request timed out")]
    RequestTimeout,

    #[error("appliance returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("appliance response is not OK: {0}")]
    NotOk(String),

    #[error("failed to parse appliance response: {0}")]
    Parse(String),

    #[error("appliance returned an empty {0}")]
    EmptyResult(&'static str),

    #[error("appliance login failed: {0}")]
    AuthenticationFailed(String),

    #[error("report layout '{0}' not found")]
    LayoutNotFound(String),

    #[error("dataset '{dataset}' update failed: {reason}")]
    DatasetUpdate { dataset: String, reason: String },

    #[error("unrecognized report state '{0}'")]
    UnrecognizedState(String),

    /// The job did not reach `generated` within the wait budget.
    #[error("report job {job} not generated after {waited:?}")]
    Timeout { job: JobId, waited: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_debug_is_redacted() {
        let token = SessionToken::new("s3cr3t-session");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("s3cr3t"));
        assert_eq!(token.as_str(), "s3cr3t-session");
    }

    #[test]
    fn test_report_state_parse() {
        assert_eq!(ReportState::parse("pending"), Some(ReportState::Pending));
        assert_eq!(ReportState::parse("running"), Some(ReportState::Running));
        assert_eq!(ReportState::parse("generated"), Some(ReportState::Generated));
        assert_eq!(ReportState::parse("failed"), None);
        assert_eq!(ReportState::parse("Generated"), None);
    }
}
