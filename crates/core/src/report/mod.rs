//! Report domain types: windows, users, artifacts, and the per-run aggregate.

mod aggregate;
mod source;
mod types;
mod window;

pub use aggregate::{AggregatePolicy, SubRequestGroup, TicketAggregate};
pub use source::{parse_flat_list, FlatListError, WorkSource};
pub use types::{initials, ReportArtifact, ReportUser, TicketOrigin};
pub use window::{
    parse_appliance_bound, parse_ticket_bound, to_appliance, to_ticket, ReportWindow,
    WindowError, APPLIANCE_FORMAT, FILENAME_FORMAT, TICKET_FORMAT,
};
