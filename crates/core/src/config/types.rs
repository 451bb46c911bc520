use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub appliance: ApplianceConfig,
    pub directory: DirectoryConfig,
    /// Required in ticket mode only.
    #[serde(default)]
    pub ticketing: Option<TicketingConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// FortiAnalyzer JSON-RPC endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplianceConfig {
    /// JSON-RPC endpoint (e.g., "https://faz.example.local/jsonrpc")
    pub url: String,
    pub user: String,
    pub password: String,
    /// Administrative domain the reports live in
    pub adom: String,
    /// Device filter passed to every report job (e.g., "All_FortiGates")
    pub device: String,
    /// Title of the report layout to run
    pub report_name: String,
    /// Datasets re-parameterized with the account id before each job
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_appliance_timeout")]
    pub timeout_secs: u32,
    /// Accept self-signed appliance certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub polling: PollingConfig,
}

fn default_appliance_timeout() -> u32 {
    60
}

/// One dataset query template. `%WORD%` placeholders are replaced by the account id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetSpec {
    pub name: String,
    pub query: String,
}

/// Report job polling schedule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_pending_delay")]
    pub pending_delay_secs: u64,
    #[serde(default = "default_running_delay")]
    pub running_delay_secs: u64,
    /// Upper bound on the accumulated wait for one job
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay(),
            pending_delay_secs: default_pending_delay(),
            running_delay_secs: default_running_delay(),
            max_wait_secs: default_max_wait(),
        }
    }
}

fn default_initial_delay() -> u64 {
    5
}

fn default_pending_delay() -> u64 {
    5
}

fn default_running_delay() -> u64 {
    10
}

fn default_max_wait() -> u64 {
    30 * 60
}

/// LDAP directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    pub host: String,
    #[serde(default = "default_ldap_port")]
    pub port: u16,
    pub base_dn: String,
    pub bind_user: String,
    pub bind_password: String,
    /// Accounts whose id starts with this prefix are never returned
    #[serde(default = "default_exclusion_prefix")]
    pub exclusion_prefix: String,
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u32,
}

fn default_ldap_port() -> u16 {
    389
}

fn default_exclusion_prefix() -> String {
    "PAM-".to_string()
}

fn default_directory_timeout() -> u32 {
    30
}

/// HD Naumen ticketing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketingConfig {
    /// Base URL (e.g., "https://sd.example.local")
    pub base_url: String,
    pub access_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_ticketing_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Text posted when a ticket is moved to "awaiting acceptance"
    #[serde(default = "default_resolution_text")]
    pub resolution_text: String,
}

fn default_ticketing_timeout() -> u32 {
    30
}

pub fn default_resolution_text() -> String {
    "Запрос  исполнен, результат во вложении!".to_string()
}

/// SQLite work item store configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
    #[serde(default = "default_processed_column")]
    pub processed_column: String,
    #[serde(default = "default_processed_date_column")]
    pub processed_date_column: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            table: default_table(),
            value_column: default_value_column(),
            processed_column: default_processed_column(),
            processed_date_column: default_processed_date_column(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/data.db")
}

fn default_table() -> String {
    "Data".to_string()
}

fn default_value_column() -> String {
    "Value".to_string()
}

fn default_processed_column() -> String {
    "Processed".to_string()
}

fn default_processed_date_column() -> String {
    "Processed_Date".to_string()
}

/// Where artifacts are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Reject artifacts whose MD5 differs from the checksum the appliance sent.
    /// Off unless enabled.
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            verify_checksum: default_verify_checksum(),
        }
    }
}

fn default_verify_checksum() -> bool {
    false
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("Reports")
}

/// Sanitized config for the startup log line (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub appliance: SanitizedApplianceConfig,
    pub directory: SanitizedDirectoryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticketing: Option<SanitizedTicketingConfig>,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApplianceConfig {
    pub url: String,
    pub user: String,
    pub password_configured: bool,
    pub adom: String,
    pub device: String,
    pub report_name: String,
    pub datasets: Vec<String>,
    pub timeout_secs: u32,
    pub accept_invalid_certs: bool,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDirectoryConfig {
    pub host: String,
    pub port: u16,
    pub base_dn: String,
    pub bind_user: String,
    pub bind_password_configured: bool,
    pub exclusion_prefix: String,
}

/// Sanitized ticketing config (access key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTicketingConfig {
    pub base_url: String,
    pub access_key_configured: bool,
    pub timeout_secs: u32,
    pub accept_invalid_certs: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let a = &config.appliance;
        let d = &config.directory;
        Self {
            appliance: SanitizedApplianceConfig {
                url: a.url.clone(),
                user: a.user.clone(),
                password_configured: !a.password.is_empty(),
                adom: a.adom.clone(),
                device: a.device.clone(),
                report_name: a.report_name.clone(),
                datasets: a.datasets.iter().map(|ds| ds.name.clone()).collect(),
                timeout_secs: a.timeout_secs,
                accept_invalid_certs: a.accept_invalid_certs,
                polling: a.polling.clone(),
            },
            directory: SanitizedDirectoryConfig {
                host: d.host.clone(),
                port: d.port,
                base_dn: d.base_dn.clone(),
                bind_user: d.bind_user.clone(),
                bind_password_configured: !d.bind_password.is_empty(),
                exclusion_prefix: d.exclusion_prefix.clone(),
            },
            ticketing: config
                .ticketing
                .as_ref()
                .map(|t| SanitizedTicketingConfig {
                    base_url: t.base_url.clone(),
                    access_key_configured: !t.access_key.is_empty(),
                    timeout_secs: t.timeout_secs,
                    accept_invalid_certs: t.accept_invalid_certs,
                }),
            database: config.database.clone(),
            output: config.output.clone(),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
