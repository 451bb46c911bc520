//! Testing utilities and mock implementations for end-to-end runs.
//!
//! This module provides mock implementations of every external service trait,
//! so a whole run can be exercised without an appliance, a ticketing system
//! or a directory server.
//!
//! # Example
//!
//! ```rust,ignore
//! use fazreport_core::testing::{CallLog, MockAppliance, MockDirectory, MockTicketing};
//!
//! let log = CallLog::new();
//! let appliance = MockAppliance::new().with_call_log(log.clone());
//! let directory = MockDirectory::new().with_call_log(log.clone());
//! let ticketing = MockTicketing::new().with_call_log(log.clone());
//!
//! directory.add_account("Ivanov Ivan Ivanovich", "iivanov").await;
//! appliance.set_states(&["pending", "generated"]).await;
//!
//! // Build a ReportOrchestrator around them...
//! ```

mod call_log;
mod mock_appliance;
mod mock_directory;
mod mock_ticketing;
mod sleeper;

pub use call_log::CallLog;
pub use mock_appliance::{payload_for, ApplianceCall, ApplianceOp, MockAppliance};
pub use mock_directory::MockDirectory;
pub use mock_ticketing::{MockTicketing, TicketingCall, TicketingOp};
pub use sleeper::RecordingSleeper;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::appliance::{PollPolicy, ReportSettings};
    use crate::config::{DatasetSpec, OutputConfig};
    use crate::report::ReportWindow;

    use super::MockAppliance;

    /// Ticket request markup as the ticketing system renders it.
    pub fn ticket_markup(names: &[&str], start: &str, end: &str) -> String {
        format!(
            "<p>Заявка на отчет</p>\
             <p>Укажите ФИО: <b>{}</b></p>\
             <p>Укажите дату: <b>{} - {}</b></p>",
            names.join(", "),
            start,
            end
        )
    }

    /// Window from ticket-format bounds (`DD.MM.YYYY HH:MM`).
    pub fn window(start: &str, end: &str) -> ReportWindow {
        ReportWindow::from_ticket_bounds(start, end).expect("fixture window is valid")
    }

    /// Settings matching the mock appliance's default layout.
    pub fn report_settings() -> ReportSettings {
        ReportSettings {
            user: "api-user".to_string(),
            password: "api-password".to_string(),
            adom: "root".to_string(),
            device: "All_FortiGates".to_string(),
            report_name: MockAppliance::DEFAULT_LAYOUT.to_string(),
            datasets: vec![
                DatasetSpec {
                    name: "user-traffic".to_string(),
                    query: "select * from traffic where user = '%USER%'".to_string(),
                },
                DatasetSpec {
                    name: "user-web".to_string(),
                    query: "select * from web where user = '%USER%'".to_string(),
                },
            ],
            poll: PollPolicy::default(),
        }
    }

    /// Output settings rooted at `results_dir`.
    pub fn output_config(results_dir: &std::path::Path) -> OutputConfig {
        OutputConfig {
            results_dir: results_dir.to_path_buf(),
            verify_checksum: true,
        }
    }
}
