//! Ticket identifiers and the report request read from a ticket.

use serde::{Deserialize, Serialize};

use super::{extract_assignees_and_window, ExtractError};
use crate::report::{ReportUser, ReportWindow, TicketOrigin};

/// What the ticketing system returns for one task id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketKeys {
    /// Parent ticket ("service call") UUID.
    pub ticket_id: String,
    /// Sub-request ("RP") title.
    pub sub_request_id: String,
    /// HTML-ish free text of the request form.
    pub sum_description: String,
}

/// A ticket's report request, ready to be expanded into report users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketContext {
    pub ticket_id: String,
    pub sub_request_id: String,
    pub work_item_id: String,
    /// Never empty.
    pub assignees: Vec<String>,
    pub window: ReportWindow,
}

impl TicketContext {
    /// Extract the request from `keys.sum_description`.
    pub fn from_keys(work_item_id: &str, keys: TicketKeys) -> Result<Self, ExtractError> {
        let (assignees, window) = extract_assignees_and_window(&keys.sum_description)?;
        Ok(Self {
            ticket_id: keys.ticket_id,
            sub_request_id: keys.sub_request_id,
            work_item_id: work_item_id.to_string(),
            assignees,
            window,
        })
    }

    pub fn origin(&self) -> TicketOrigin {
        TicketOrigin {
            ticket_id: self.ticket_id.clone(),
            sub_request_id: self.sub_request_id.clone(),
            work_item_id: self.work_item_id.clone(),
        }
    }

    /// One report user per assignee, all sharing the ticket's window.
    pub fn report_users(&self) -> Vec<ReportUser> {
        self.assignees
            .iter()
            .map(|name| ReportUser::for_ticket(name.as_str(), self.window, self.origin()))
            .collect()
    }
}
