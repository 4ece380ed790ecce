//! Database schema for the run ledger
//!
//! One row per run and one row per finished job. Job rows are written batch by
//! batch, so an aborted run still shows every batch that completed.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    course_count INTEGER NOT NULL DEFAULT 0,
    batch_count INTEGER NOT NULL DEFAULT 0,
    pool_size INTEGER NOT NULL DEFAULT 0
);

-- One row per terminal job
CREATE TABLE IF NOT EXISTS job_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    course_id TEXT NOT NULL,
    lesson_id TEXT NOT NULL,
    slug TEXT NOT NULL,
    status TEXT NOT NULL,
    error_kind TEXT,
    error_detail TEXT,
    duration_ms INTEGER NOT NULL,
    batch_index INTEGER NOT NULL,
    credential_index INTEGER NOT NULL,
    credential_label TEXT NOT NULL,
    artifact_count INTEGER NOT NULL DEFAULT 0,
    failed_assets INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_job_results_run ON job_results(run_id);
CREATE INDEX IF NOT EXISTS idx_job_results_status ON job_results(run_id, status);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
