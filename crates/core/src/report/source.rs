//! Where a run gets its report users from.

use thiserror::Error;

use super::{ReportUser, ReportWindow, WindowError};
use crate::ticketing::TicketContext;

/// Errors raised while reading a flat user list.
#[derive(Debug, Error)]
pub enum FlatListError {
    #[error("line {line}: expected 'name,start,end', got {fields} field(s)")]
    FieldCount { line: usize, fields: usize },

    #[error("line {line}: empty display name")]
    EmptyName { line: usize },

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: {source}")]
    Window {
        line: usize,
        #[source]
        source: WindowError,
    },
}

/// The resolved input of one run.
#[derive(Debug, Clone)]
pub enum WorkSource {
    /// Ticket contexts read from the store and the ticketing system.
    Tickets(Vec<TicketContext>),
    /// Users read from a flat list; no ticketing, no store updates.
    FlatList(Vec<ReportUser>),
}

impl WorkSource {
    /// Expand the source into report users, in input order.
    pub fn report_users(&self) -> Vec<ReportUser> {
        match self {
            WorkSource::Tickets(contexts) => {
                contexts.iter().flat_map(|c| c.report_users()).collect()
            }
            WorkSource::FlatList(users) => users.clone(),
        }
    }

    pub fn is_ticket_mode(&self) -> bool {
        matches!(self, WorkSource::Tickets(_))
    }
}

/// Split one record into fields.
///
/// Fields may be double-quoted; a quoted field can hold commas and `""`
/// stands for a literal quote. Records cannot span lines.
fn split_record(raw: &str, line: usize) -> Result<Vec<String>, FlatListError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }

    if in_quotes {
        return Err(FlatListError::UnterminatedQuote { line });
    }
    fields.push(field);
    Ok(fields)
}

/// Parse `name,start,end` rows with bounds in appliance format.
///
/// Blank lines are ignored.
pub fn parse_flat_list(text: &str) -> Result<Vec<ReportUser>, FlatListError> {
    let mut users = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim_start_matches('\u{feff}').trim();
        if raw.is_empty() {
            continue;
        }

        let fields = split_record(raw, line)?;
        let [name, start, end] = fields.as_slice() else {
            return Err(FlatListError::FieldCount {
                line,
                fields: fields.len(),
            });
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(FlatListError::EmptyName { line });
        }

        let window = ReportWindow::from_appliance_bounds(start.trim(), end.trim())
            .map_err(|source| FlatListError::Window { line, source })?;

        users.push(ReportUser::new(name, window));
    }

    Ok(users)
}
