//! Contribution history storage and retrieval using SQLite.
//!
//! Manages persistent storage of all contributions with timestamps and
//! delivery status, and provides querying capabilities for the history
//! listing. Only the 50 most recent entries are kept.

use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Maximum number of history entries retained.
const MAX_ENTRIES: usize = 50;

/// Webhook delivery status of a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Saved locally, delivery not yet attempted or skipped
    Pending,
    /// Delivered to the webhook
    Complete,
    /// Delivery failed (see the error message)
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "complete" => Self::Complete,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }
}

/// A single contribution entry in the history.
#[derive(Debug, Clone)]
pub struct Contribution {
    /// Unique identifier for this contribution
    pub id: i64,
    /// Contribution category ("audio" or "image")
    pub category: String,
    /// File name as delivered to the webhook
    pub file_name: String,
    /// Recording duration in seconds (audio contributions only)
    pub duration_secs: Option<f64>,
    /// Webhook delivery status
    pub status: UploadStatus,
    /// Delivery error message, if any
    pub error: Option<String>,
    /// When this contribution was created
    pub created_at: DateTime<Local>,
}

/// Manages the contribution history database.
pub struct HistoryStore {
    /// Path to the SQLite database file
    database_path: PathBuf,
    /// Connection to the database (lazy-loaded)
    connection: Option<Connection>,
}

impl HistoryStore {
    /// Creates a new history store for the given data directory.
    ///
    /// # Arguments
    /// * `data_dir` - Directory where the database file will be stored
    ///
    /// # Errors
    /// - If the data directory cannot be created
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let database_path = data_dir.join("history.db");

        Ok(Self {
            database_path,
            connection: None,
        })
    }

    /// Initializes database connection and creates tables if necessary.
    ///
    /// # Errors
    /// - If the database file cannot be opened
    /// - If table creation fails
    fn get_connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;

            connection.execute(
                "CREATE TABLE IF NOT EXISTS contributions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    category TEXT NOT NULL,
                    file_name TEXT NOT NULL,
                    duration_secs REAL,
                    status TEXT NOT NULL,
                    error TEXT,
                    created_at TEXT NOT NULL
                )",
                [],
            )?;

            self.connection = Some(connection);
        }

        Ok(self.connection.as_ref().unwrap())
    }

    /// Records a new contribution with `pending` status and returns its id.
    ///
    /// Older entries beyond the retention cap are pruned.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If insertion fails
    pub fn insert_pending(
        &mut self,
        category: &str,
        file_name: &str,
        duration_secs: Option<f64>,
    ) -> Result<i64> {
        let connection = self.get_connection()?;
        let timestamp = Local::now().to_rfc3339();

        connection.execute(
            "INSERT INTO contributions (category, file_name, duration_secs, status, error, created_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
            params![
                category,
                file_name,
                duration_secs,
                UploadStatus::Pending.as_str(),
                timestamp
            ],
        )?;
        let id = connection.last_insert_rowid();

        self.prune()?;
        tracing::debug!("Contribution {} saved to history", id);
        Ok(id)
    }

    /// Marks a contribution as delivered.
    ///
    /// # Errors
    /// - If database connection fails or the update fails
    pub fn mark_complete(&mut self, id: i64) -> Result<()> {
        let connection = self.get_connection()?;
        connection.execute(
            "UPDATE contributions SET status = ?1, error = NULL WHERE id = ?2",
            params![UploadStatus::Complete.as_str(), id],
        )?;
        Ok(())
    }

    /// Marks a contribution's delivery as failed with a message.
    ///
    /// # Errors
    /// - If database connection fails or the update fails
    pub fn mark_error(&mut self, id: i64, message: &str) -> Result<()> {
        let connection = self.get_connection()?;
        connection.execute(
            "UPDATE contributions SET status = ?1, error = ?2 WHERE id = ?3",
            params![UploadStatus::Error.as_str(), message, id],
        )?;
        Ok(())
    }

    /// Retrieves all contributions ordered by most recent first.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If query execution fails
    /// - If timestamp parsing fails
    pub fn list(&mut self) -> Result<Vec<Contribution>> {
        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, category, file_name, duration_secs, status, error, created_at
             FROM contributions ORDER BY id DESC",
        )?;

        let entries = statement
            .query_map([], |row| {
                let id = row.get::<_, i64>(0)?;
                let category = row.get::<_, String>(1)?;
                let file_name = row.get::<_, String>(2)?;
                let duration_secs = row.get::<_, Option<f64>>(3)?;
                let status = UploadStatus::parse(&row.get::<_, String>(4)?);
                let error = row.get::<_, Option<String>>(5)?;
                let timestamp_str = row.get::<_, String>(6)?;

                let created_at = DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Local))
                    .map_err(|_| {
                        rusqlite::Error::InvalidParameterName(
                            "Invalid timestamp format".to_string(),
                        )
                    })?;

                Ok(Contribution {
                    id,
                    category,
                    file_name,
                    duration_secs,
                    status,
                    error,
                    created_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Deletes entries beyond the retention cap, oldest first.
    fn prune(&mut self) -> Result<()> {
        let connection = self.get_connection()?;
        connection.execute(
            "DELETE FROM contributions WHERE id NOT IN
             (SELECT id FROM contributions ORDER BY id DESC LIMIT ?1)",
            params![MAX_ENTRIES as i64],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path()).unwrap()
    }

    #[test]
    fn inserts_and_lists_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        store
            .insert_pending("audio", "first.wav", Some(3.2))
            .unwrap();
        store.insert_pending("image", "second.jpg", None).unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_name, "second.jpg");
        assert_eq!(entries[0].status, UploadStatus::Pending);
        assert_eq!(entries[1].file_name, "first.wav");
        assert_eq!(entries[1].duration_secs, Some(3.2));
    }

    #[test]
    fn status_updates_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        let ok_id = store.insert_pending("audio", "ok.wav", Some(1.0)).unwrap();
        let bad_id = store.insert_pending("audio", "bad.wav", Some(1.0)).unwrap();

        store.mark_complete(ok_id).unwrap();
        store.mark_error(bad_id, "webhook timed out").unwrap();

        let entries = store.list().unwrap();
        let ok = entries.iter().find(|e| e.id == ok_id).unwrap();
        let bad = entries.iter().find(|e| e.id == bad_id).unwrap();

        assert_eq!(ok.status, UploadStatus::Complete);
        assert!(ok.error.is_none());
        assert_eq!(bad.status, UploadStatus::Error);
        assert_eq!(bad.error.as_deref(), Some("webhook timed out"));
    }

    #[test]
    fn prunes_to_retention_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        for i in 0..60 {
            store
                .insert_pending("audio", &format!("note-{i}.wav"), None)
                .unwrap();
        }

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), MAX_ENTRIES);
        // The newest entries survive
        assert_eq!(entries[0].file_name, "note-59.wav");
        assert_eq!(entries.last().unwrap().file_name, "note-10.wav");
    }
}
