//! Report time windows and the textual formats they travel in.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format used inside ticket markup (`02.11.2024 00:01`).
pub const TICKET_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Format the appliance expects for `period-start`/`period-end` (`00:01:00 2024/11/02`).
pub const APPLIANCE_FORMAT: &str = "%H:%M:%S %Y/%m/%d";

/// Format used when a window bound becomes part of an artifact file name.
pub const FILENAME_FORMAT: &str = "%d-%m-%Y-T-%H-%M-%S";

/// Errors raised while building a report window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("cannot parse '{value}' as {format}")]
    Unparseable { value: String, format: &'static str },

    #[error("window start {start} is not before end {end}")]
    Inverted { start: String, end: String },
}

/// A half-open `[start, end)` interval a report is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ReportWindow {
    /// Build a window, rejecting empty or inverted intervals.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Inverted {
                start: start.format(APPLIANCE_FORMAT).to_string(),
                end: end.format(APPLIANCE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Build a window from two bounds written in ticket format.
    pub fn from_ticket_bounds(start: &str, end: &str) -> Result<Self, WindowError> {
        Self::new(parse_ticket_bound(start)?, parse_ticket_bound(end)?)
    }

    /// Build a window from two bounds written in appliance format.
    pub fn from_appliance_bounds(start: &str, end: &str) -> Result<Self, WindowError> {
        Self::new(parse_appliance_bound(start)?, parse_appliance_bound(end)?)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Start bound in appliance wire format.
    pub fn appliance_start(&self) -> String {
        to_appliance(&self.start)
    }

    /// End bound in appliance wire format.
    pub fn appliance_end(&self) -> String {
        to_appliance(&self.end)
    }

    /// `<start>_<end>` suffix used for flat-list artifact names.
    pub fn file_suffix(&self) -> String {
        format!(
            "{}_{}",
            self.start.format(FILENAME_FORMAT),
            self.end.format(FILENAME_FORMAT)
        )
    }
}

/// Parse a `DD.MM.YYYY HH:MM` bound.
pub fn parse_ticket_bound(value: &str) -> Result<NaiveDateTime, WindowError> {
    NaiveDateTime::parse_from_str(value.trim(), TICKET_FORMAT).map_err(|_| {
        WindowError::Unparseable {
            value: value.to_string(),
            format: TICKET_FORMAT,
        }
    })
}

/// Parse a `HH:MM:SS YYYY/MM/DD` bound.
pub fn parse_appliance_bound(value: &str) -> Result<NaiveDateTime, WindowError> {
    NaiveDateTime::parse_from_str(value.trim(), APPLIANCE_FORMAT).map_err(|_| {
        WindowError::Unparseable {
            value: value.to_string(),
            format: APPLIANCE_FORMAT,
        }
    })
}

pub fn to_appliance(instant: &NaiveDateTime) -> String {
    instant.format(APPLIANCE_FORMAT).to_string()
}

pub fn to_ticket(instant: &NaiveDateTime) -> String {
    instant.format(TICKET_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_bound_converts_to_appliance_format() {
        let start = parse_ticket_bound("02.11.2024 00:01").unwrap();
        assert_eq!(to_appliance(&start), "00:01:00 2024/11/02");

        let end = parse_ticket_bound("03.11.2024 23:59").unwrap();
        assert_eq!(to_appliance(&end), "23:59:00 2024/11/03");
    }

    #[test]
    fn test_ticket_appliance_round_trip_preserves_instant() {
        for raw in ["01.01.2024 00:00", "29.02.2024 12:30", "31.12.2025 23:59"] {
            let instant = parse_ticket_bound(raw).unwrap();
            let wire = to_appliance(&instant);
            let back = parse_appliance_bound(&wire).unwrap();
            assert_eq!(back, instant);
            assert_eq!(to_ticket(&back), raw);
        }
    }

    #[test]
    fn test_unparseable_bound() {
        let err = parse_ticket_bound("2024-11-02 00:01").unwrap_err();
        assert!(matches!(err, WindowError::Unparseable { .. }));

        let err = parse_appliance_bound("02.11.2024 00:01").unwrap_err();
        assert!(matches!(err, WindowError::Unparseable { .. }));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = ReportWindow::from_ticket_bounds("03.11.2024 00:00", "02.11.2024 00:00")
            .unwrap_err();
        assert!(matches!(err, WindowError::Inverted { .. }));

        let err = ReportWindow::from_ticket_bounds("03.11.2024 00:00", "03.11.2024 00:00")
            .unwrap_err();
        assert!(matches!(err, WindowError::Inverted { .. }));
    }

    #[test]
    fn test_file_suffix() {
        let window =
            ReportWindow::from_appliance_bounds("00:00:01 2024/08/04", "23:59:59 2024/08/04")
                .unwrap();
        assert_eq!(
            window.file_suffix(),
            "04-08-2024-T-00-00-01_04-08-2024-T-23-59-59"
        );
    }
}
