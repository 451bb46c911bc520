//! SQLite-backed work item store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::{ProcessedStatus, StoreError, TableLayout, WorkItem, WorkItemStore, PROCESSED_DATE_FORMAT};

/// SQLite-backed work item store.
///
/// The table is owned by the process that enqueues task ids. [`open`] only
/// attaches to an existing database and never creates or migrates it.
///
/// [`open`]: SqliteWorkItemStore::open
#[derive(Debug)]
pub struct SqliteWorkItemStore {
    conn: Mutex<Connection>,
    layout: TableLayout,
}

impl SqliteWorkItemStore {
    /// Open an existing database whose work item table matches `layout`.
    pub fn open(path: &Path, layout: TableLayout) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Database(format!("{}: {}", path.display(), e)))?;
        Self::check_schema(&conn, &layout)?;
        Ok(Self {
            conn: Mutex::new(conn),
            layout,
        })
    }

    /// Create a database file with an empty work item table.
    ///
    /// Used to provision a fresh store; the parent directory must exist.
    pub fn create(path: &Path, layout: TableLayout) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn, &layout)?;
        Ok(Self {
            conn: Mutex::new(conn),
            layout,
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(layout: TableLayout) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn, &layout)?;
        Ok(Self {
            conn: Mutex::new(conn),
            layout,
        })
    }

    fn initialize_schema(conn: &Connection, layout: &TableLayout) -> Result<(), StoreError> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                {value} TEXT NOT NULL UNIQUE,
                {processed} INTEGER,
                {processed_date} TEXT
            );
            "#,
            table = layout.table,
            value = layout.value_column,
            processed = layout.processed_column,
            processed_date = layout.processed_date_column,
        ))?;
        Ok(())
    }

    fn check_schema(conn: &Connection, layout: &TableLayout) -> Result<(), StoreError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", layout.table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(StoreError::MissingTable(layout.table.clone()));
        }

        for column in [
            &layout.value_column,
            &layout.processed_column,
            &layout.processed_date_column,
        ] {
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                return Err(StoreError::MissingColumn {
                    table: layout.table.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))
    }

    /// Enqueue a new unprocessed work item. Existing ids are left untouched.
    pub fn add_work_item(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let l = &self.layout;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES (?)",
                l.table, l.value_column
            ),
            params![id],
        )?;
        Ok(())
    }

    fn row_to_work_item(row: &rusqlite::Row) -> rusqlite::Result<WorkItem> {
        let id: String = row.get(0)?;
        let processed: Option<i64> = row.get(1)?;
        let processed_at: Option<String> = row.get(2)?;
        Ok(WorkItem {
            id,
            status: ProcessedStatus::from_column(processed),
            processed_at,
        })
    }
}

impl WorkItemStore for SqliteWorkItemStore {
    fn unprocessed(&self) -> Result<Vec<WorkItem>, StoreError> {
        let conn = self.lock()?;
        let l = &self.layout;
        let mut stmt = conn.prepare(&format!(
            "SELECT {value}, {processed}, {processed_date} FROM {table} WHERE {processed} IS NULL ORDER BY rowid",
            table = l.table,
            value = l.value_column,
            processed = l.processed_column,
            processed_date = l.processed_date_column,
        ))?;

        let items = stmt
            .query_map([], Self::row_to_work_item)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = items.len(), "Loaded unprocessed work items");
        Ok(items)
    }

    fn get(&self, id: &str) -> Result<Option<WorkItem>, StoreError> {
        let conn = self.lock()?;
        let l = &self.layout;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {value}, {processed}, {processed_date} FROM {table} WHERE {value} = ?",
                    table = l.table,
                    value = l.value_column,
                    processed = l.processed_column,
                    processed_date = l.processed_date_column,
                ),
                params![id],
                Self::row_to_work_item,
            )
            .optional()?;
        Ok(item)
    }

    fn mark_processed(
        &self,
        id: &str,
        status: ProcessedStatus,
        at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let Some(flag) = status.to_column() else {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                status,
            });
        };

        let conn = self.lock()?;
        let l = &self.layout;
        let updated = conn.execute(
            &format!(
                "UPDATE {table} SET {processed} = ?, {processed_date} = ? WHERE {value} = ?",
                table = l.table,
                value = l.value_column,
                processed = l.processed_column,
                processed_date = l.processed_date_column,
            ),
            params![flag, at.format(PROCESSED_DATE_FORMAT).to_string(), id],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(work_item_id = %id, ?status, "Marked work item processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_store() -> SqliteWorkItemStore {
        SqliteWorkItemStore::in_memory(TableLayout::default()).unwrap()
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 2)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_unprocessed_in_insertion_order() {
        let store = create_test_store();
        store.add_work_item("data$3").unwrap();
        store.add_work_item("data$1").unwrap();
        store.add_work_item("data$2").unwrap();

        let ids: Vec<_> = store
            .unprocessed()
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["data$3", "data$1", "data$2"]);
    }

    #[test]
    fn test_add_work_item_is_idempotent() {
        let store = create_test_store();
        store.add_work_item("data$1").unwrap();
        store.add_work_item("data$1").unwrap();
        assert_eq!(store.unprocessed().unwrap().len(), 1);
    }

    #[test]
    fn test_mark_processed_sets_flag_and_date() {
        let store = create_test_store();
        store.add_work_item("data$1").unwrap();
        store.add_work_item("data$2").unwrap();

        store
            .mark_processed("data$1", ProcessedStatus::Succeeded, at())
            .unwrap();

        let item = store.get("data$1").unwrap().unwrap();
        assert_eq!(item.status, ProcessedStatus::Succeeded);
        assert_eq!(item.processed_at.as_deref(), Some("02.11.2024 14:05:09"));

        let remaining = store.unprocessed().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "data$2");
    }

    #[test]
    fn test_mark_failed_is_processed() {
        let store = create_test_store();
        store.add_work_item("data$1").unwrap();
        store
            .mark_processed("data$1", ProcessedStatus::Failed, at())
            .unwrap();

        let item = store.get("data$1").unwrap().unwrap();
        assert_eq!(item.status, ProcessedStatus::Failed);
        assert!(store.unprocessed().unwrap().is_empty());
    }

    #[test]
    fn test_mark_processed_unknown_id() {
        let store = create_test_store();
        let err = store
            .mark_processed("data$404", ProcessedStatus::Succeeded, at())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "data$404"));
    }

    #[test]
    fn test_mark_unprocessed_rejected() {
        let store = create_test_store();
        store.add_work_item("data$1").unwrap();
        let err = store
            .mark_processed("data$1", ProcessedStatus::Unprocessed, at())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_custom_layout() {
        let layout = TableLayout {
            table: "Tasks".to_string(),
            value_column: "TaskId".to_string(),
            processed_column: "Done".to_string(),
            processed_date_column: "DoneAt".to_string(),
        };
        let store = SqliteWorkItemStore::in_memory(layout).unwrap();
        store.add_work_item("t1").unwrap();
        store
            .mark_processed("t1", ProcessedStatus::Succeeded, at())
            .unwrap();
        assert!(store.unprocessed().unwrap().is_empty());
    }

    #[test]
    fn test_file_based_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.db");

        {
            let store = SqliteWorkItemStore::create(&path, TableLayout::default()).unwrap();
            store.add_work_item("data$1").unwrap();
        }

        let store = SqliteWorkItemStore::open(&path, TableLayout::default()).unwrap();
        assert_eq!(store.unprocessed().unwrap()[0].id, "data$1");
    }

    #[test]
    fn test_open_missing_database_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dta").join("data.db");

        let result = SqliteWorkItemStore::open(&path, TableLayout::default());
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(!path.exists());
        assert!(!dir.path().join("dta").exists());

        // Missing file in an existing directory is not created either.
        let path = dir.path().join("data.db");
        assert!(SqliteWorkItemStore::open(&path, TableLayout::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_without_work_item_table_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE Other (Value TEXT);")
            .unwrap();

        let err = SqliteWorkItemStore::open(&path, TableLayout::default()).unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(table) if table == "Data"));
    }

    #[test]
    fn test_open_with_missing_column_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE Data (Value TEXT, Processed INTEGER);")
            .unwrap();

        let err = SqliteWorkItemStore::open(&path, TableLayout::default()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MissingColumn { column, .. } if column == "Processed_Date"
        ));
    }
}
