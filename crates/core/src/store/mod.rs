//! Persistence store of ticketing task ids awaiting a report run.

mod sqlite;
mod types;

pub use sqlite::SqliteWorkItemStore;
pub use types::{
    ProcessedStatus, StoreError, TableLayout, WorkItem, WorkItemStore, PROCESSED_DATE_FORMAT,
};
