use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use serde_json::Map;
use time::OffsetDateTime;

use crate::domain::Incident;
use crate::error::AppError;
use crate::query::{ListParams, ListQuery};
use crate::repo::{self, IncidentPage};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoreMetadata {
    pub db_path: String,
    pub incident_count: i64,
}

fn validate_db_path(path: &Path) -> Result<(), AppError> {
    if path.as_os_str().is_empty() {
        return Err(AppError::config("STORE_INVALID_PATH", "Database path is empty"));
    }
    if path.exists() && path.is_dir() {
        return Err(AppError::config(
            "STORE_INVALID_PATH",
            "Database path must be a file (not a directory)",
        )
        .with_details(path.display().to_string()));
    }
    Ok(())
}

/// Owned handle to the incident database. Each operation runs on its own connection, so a
/// long read never blocks a writer and SQLite serializes concurrent writers itself.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply pending migrations.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, AppError> {
        validate_db_path(path)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config("STORE_CREATE_FAILED", "Failed to create database directory")
                    .with_details(format!("path={}; err={}", parent.display(), e))
            })?;
        }

        let store = Self {
            path: path.to_path_buf(),
            busy_timeout,
        };

        let mut conn = store.connection()?;
        crate::db::migrate(&mut conn).map_err(|e| {
            let details = e.details.clone().unwrap_or_else(|| e.to_string());
            AppError::storage("STORE_MIGRATION_FAILED", "Failed to migrate database")
                .with_details(details)
        })?;

        tracing::info!(path = %store.path.display(), "opened incident store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh, configured connection to the store's database.
    pub fn connection(&self) -> Result<Connection, AppError> {
        let conn = crate::db::open(&self.path)?;
        crate::db::configure(&conn, self.busy_timeout)?;
        Ok(conn)
    }

    pub fn metadata(&self) -> Result<StoreMetadata, AppError> {
        let conn = self.connection()?;
        Ok(StoreMetadata {
            db_path: self.path.to_string_lossy().to_string(),
            incident_count: repo::count_incidents(&conn)?,
        })
    }

    pub fn create_incident(
        &self,
        payload: &Map<String, serde_json::Value>,
    ) -> Result<Incident, AppError> {
        let conn = self.connection()?;
        repo::create_incident(&conn, payload, OffsetDateTime::now_utc())
    }

    pub fn get_incident(&self, id: &str) -> Result<Incident, AppError> {
        let conn = self.connection()?;
        repo::get_incident(&conn, id)
    }

    pub fn update_incident(
        &self,
        id: &str,
        payload: &Map<String, serde_json::Value>,
    ) -> Result<Incident, AppError> {
        let conn = self.connection()?;
        repo::update_incident(&conn, id, payload, OffsetDateTime::now_utc())
    }

    pub fn list_incidents(&self, params: &ListParams) -> Result<IncidentPage, AppError> {
        let conn = self.connection()?;
        repo::list_incidents(&conn, &ListQuery::from_params(params))
    }

    pub fn seed_demo(&self, count: usize) -> Result<usize, AppError> {
        let mut conn = self.connection()?;
        crate::demo::seed_demo_dataset(&mut conn, count, OffsetDateTime::now_utc())
    }

    /// Fold the WAL back into the main database file and release the handle.
    pub fn close(self) -> Result<(), AppError> {
        let conn = self.connection()?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .map_err(|e| {
                AppError::storage("STORE_CLOSE_FAILED", "Failed to checkpoint database")
                    .with_details(e.to_string())
            })?;
        conn.close().map_err(|(_, e)| {
            AppError::storage("STORE_CLOSE_FAILED", "Failed to close database")
                .with_details(e.to_string())
        })?;
        tracing::info!(path = %self.path.display(), "closed incident store");
        Ok(())
    }
}
