//! Extraction of requested users and time window from ticket markup.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

use crate::report::{ReportWindow, WindowError};

static ASSIGNEES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Укажите ФИО:+ +<b>(.*?)</b>").expect("assignee pattern is valid")
});

static DATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Укажите дату:+ +<b>(.*?)</b>").expect("date pattern is valid")
});

/// Separator between the two bounds of the requested period.
const RANGE_SEPARATOR: &str = " - ";

/// Why a ticket's markup could not be turned into a report request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no assignee names found in ticket markup")]
    MissingAssignees,

    #[error("no complete date range found in ticket markup")]
    MissingWindow,

    #[error("invalid date range in ticket markup: {0}")]
    InvalidWindow(#[from] WindowError),
}

/// Pull the assignee display names and the report window out of `markup`.
///
/// Names are comma-separated, trimmed, empty names dropped. The window is
/// `DD.MM.YYYY HH:MM - DD.MM.YYYY HH:MM` and must be non-empty.
pub fn extract_assignees_and_window(
    markup: &str,
) -> Result<(Vec<String>, ReportWindow), ExtractError> {
    let assignees: Vec<String> = ASSIGNEES
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if assignees.is_empty() {
        return Err(ExtractError::MissingAssignees);
    }

    let range = DATES
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .ok_or(ExtractError::MissingWindow)?
        .as_str();

    let bounds: Vec<&str> = range.split(RANGE_SEPARATOR).collect();
    let [start, end] = bounds.as_slice() else {
        return Err(if bounds.len() < 2 {
            ExtractError::MissingWindow
        } else {
            ExtractError::InvalidWindow(WindowError::Unparseable {
                value: range.to_string(),
                format: "DD.MM.YYYY HH:MM - DD.MM.YYYY HH:MM",
            })
        });
    };

    let window = ReportWindow::from_ticket_bounds(start, end)?;
    Ok((assignees, window))
}
