//! Report users and the artifacts produced for them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ReportWindow;

/// Where a report user came from when it was derived from a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOrigin {
    /// Parent ticket ("service call") identifier.
    pub ticket_id: String,
    /// Sub-request ("RP") identifier.
    pub sub_request_id: String,
    /// Persistence store id of the work item the ticket was read from.
    pub work_item_id: String,
}

/// One (person, time window) pair a report must be generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportUser {
    pub display_name: String,
    pub initials: String,
    pub window: ReportWindow,
    /// Set only in ticket mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<TicketOrigin>,
}

impl ReportUser {
    /// A user read from a flat list, not tied to any ticket.
    pub fn new(display_name: impl Into<String>, window: ReportWindow) -> Self {
        let display_name = display_name.into();
        Self {
            initials: initials(&display_name),
            display_name,
            window,
            origin: None,
        }
    }

    /// A user expanded from a ticket's assignee list.
    pub fn for_ticket(
        display_name: impl Into<String>,
        window: ReportWindow,
        origin: TicketOrigin,
    ) -> Self {
        Self {
            origin: Some(origin),
            ..Self::new(display_name, window)
        }
    }
}

/// A report written to disk for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<TicketOrigin>,
}

/// Short form of a display name: the first word verbatim, every following
/// word reduced to its first character and a dot.
///
/// `"Иван Петрович Сидоров"` becomes `"Иван П. С."`.
pub fn initials(display_name: &str) -> String {
    let mut words = display_name.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };

    let mut parts = vec![first.to_string()];
    parts.extend(
        words.filter_map(|word| word.chars().next().map(|c| format!("{}.", c))),
    );
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> ReportWindow {
        ReportWindow::from_ticket_bounds("02.11.2024 00:01", "03.11.2024 23:59").unwrap()
    }

    #[test]
    fn test_initials_cyrillic() {
        assert_eq!(initials("Иван Петрович Сидоров"), "Иван П. С.");
    }

    #[test]
    fn test_initials_keeps_case_as_is() {
        assert_eq!(initials("Smith john doe"), "Smith j. d.");
    }

    #[test]
    fn test_initials_single_word_and_empty() {
        assert_eq!(initials("Admin"), "Admin");
        assert_eq!(initials(""), "");
        assert_eq!(initials("   "), "");
    }

    #[test]
    fn test_initials_collapses_extra_whitespace() {
        assert_eq!(initials("  Ann   Bee  "), "Ann B.");
    }

    #[test]
    fn test_for_ticket_sets_origin_and_initials() {
        let origin = TicketOrigin {
            ticket_id: "serviceCall$1".to_string(),
            sub_request_id: "RP1".to_string(),
            work_item_id: "data$1".to_string(),
        };
        let user = ReportUser::for_ticket("Ann A", window(), origin.clone());
        assert_eq!(user.initials, "Ann A.");
        assert_eq!(user.origin, Some(origin));

        let flat = ReportUser::new("Bob B", window());
        assert!(flat.origin.is_none());
    }
}
