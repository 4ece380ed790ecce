//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::job::{ErrorKind, JobResult, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{JobRecord, NewRun, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, course_count, batch_count, pool_size";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        course_count: row.get::<_, i64>(5)? as usize,
        batch_count: row.get::<_, i64>(6)? as usize,
        pool_size: row.get::<_, i64>(7)? as usize,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, course_count, batch_count, pool_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                run.config_hash,
                RunStatus::Running.to_db_string(),
                run.course_count as i64,
                run.batch_count as i64,
                run.pool_size as i64
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Job Results =====

    fn record_batch(&mut self, run_id: i64, results: &[JobResult]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO job_results (run_id, course_id, lesson_id, slug, status, error_kind,
                 error_detail, duration_ms, batch_index, credential_index, credential_label,
                 artifact_count, failed_assets, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for result in results {
                stmt.execute(params![
                    run_id,
                    result.course_id,
                    result.lesson_id,
                    result.slug,
                    result.status.to_db_string(),
                    result.error_kind.map(|k| k.to_db_string()),
                    result.error_detail,
                    result.duration.as_millis() as i64,
                    result.batch_index as i64,
                    result.credential_index as i64,
                    result.credential_label,
                    result.artifact_paths.len() as i64,
                    result.failed_assets as i64,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_run_results(&self, run_id: i64) -> StorageResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT course_id, lesson_id, slug, status, error_kind, error_detail, duration_ms,
             batch_index, credential_index, credential_label, artifact_count, failed_assets
             FROM job_results WHERE run_id = ?1
             ORDER BY batch_index ASC, credential_index ASC",
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(JobRecord {
                    course_id: row.get(0)?,
                    lesson_id: row.get(1)?,
                    slug: row.get(2)?,
                    status: JobStatus::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(JobStatus::Failure),
                    error_kind: row
                        .get::<_, Option<String>>(4)?
                        .as_deref()
                        .and_then(ErrorKind::from_db_string),
                    error_detail: row.get(5)?,
                    duration_ms: row.get::<_, i64>(6)? as u64,
                    batch_index: row.get::<_, i64>(7)? as usize,
                    credential_index: row.get::<_, i64>(8)? as usize,
                    credential_label: row.get(9)?,
                    artifact_count: row.get::<_, i64>(10)? as usize,
                    failed_assets: row.get::<_, i64>(11)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn failed_lesson_ids(&self, run_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT lesson_id FROM job_results WHERE run_id = ?1 AND status = ?2
             ORDER BY batch_index ASC, credential_index ASC",
        )?;

        let ids = stmt
            .query_map(
                params![run_id, JobStatus::Failure.to_db_string()],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }
}
