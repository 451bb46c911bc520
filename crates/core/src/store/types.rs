//! Work item types for the persistence store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp format of the processed-date column (`02.11.2024 14:05:09`).
pub const PROCESSED_DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Processing status of a work item, stored as NULL / 1 / 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedStatus {
    Unprocessed,
    Succeeded,
    Failed,
}

impl ProcessedStatus {
    /// Column value for this status.
    pub fn to_column(self) -> Option<i64> {
        match self {
            ProcessedStatus::Unprocessed => None,
            ProcessedStatus::Succeeded => Some(1),
            ProcessedStatus::Failed => Some(0),
        }
    }

    /// Status for a column value. Any non-zero integer counts as success.
    pub fn from_column(value: Option<i64>) -> Self {
        match value {
            None => ProcessedStatus::Unprocessed,
            Some(0) => ProcessedStatus::Failed,
            Some(_) => ProcessedStatus::Succeeded,
        }
    }
}

/// One row of the work item table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Ticketing task identifier.
    pub id: String,
    pub status: ProcessedStatus,
    /// Formatted with [`PROCESSED_DATE_FORMAT`].
    pub processed_at: Option<String>,
}

/// Table and column names of the work item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub table: String,
    pub value_column: String,
    pub processed_column: String,
    pub processed_date_column: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::from(&crate::config::DatabaseConfig::default())
    }
}

impl From<&crate::config::DatabaseConfig> for TableLayout {
    fn from(config: &crate::config::DatabaseConfig) -> Self {
        Self {
            table: config.table.clone(),
            value_column: config.value_column.clone(),
            processed_column: config.processed_column.clone(),
            processed_date_column: config.processed_date_column.clone(),
        }
    }
}

/// Errors from the work item store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("work item table '{0}' does not exist")]
    MissingTable(String),

    #[error("work item table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    /// The update matched no row.
    #[error("work item not found: {0}")]
    NotFound(String),

    #[error("cannot mark work item {id} as {status:?}")]
    InvalidTransition { id: String, status: ProcessedStatus },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Trait for work item storage backends.
pub trait WorkItemStore: Send + Sync {
    /// Ids of all rows whose processed column is NULL, in insertion order.
    fn unprocessed(&self) -> Result<Vec<WorkItem>, StoreError>;

    /// Get a work item by id.
    fn get(&self, id: &str) -> Result<Option<WorkItem>, StoreError>;

    /// Set the processed flag and date of one work item.
    ///
    /// Fails with [`StoreError::NotFound`] when no row was updated.
    fn mark_processed(
        &self,
        id: &str,
        status: ProcessedStatus,
        at: chrono::NaiveDateTime,
    ) -> Result<(), StoreError>;
}
