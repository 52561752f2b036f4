// src/core/database.rs
//! SQLite connection management and schema migrations

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::core::FsOps;

// ===== Core Database Connection Management =====

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub async fn connect(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                FsOps::ensure_dir_exists(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to database: {}", database_path.display())
            })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs.
    /// A single long-lived connection keeps the schema alive.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Migration failed: {}", first_line(statement)))?;
        }

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

fn first_line(statement: &str) -> &str {
    statement
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(statement)
}

// ===== Schema =====

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS job_postings (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        department TEXT,
        location TEXT,
        employment_type TEXT NOT NULL DEFAULT 'FULL_TIME',
        salary_min REAL,
        salary_max REAL,
        salary_currency TEXT NOT NULL DEFAULT 'USD',
        description TEXT NOT NULL,
        requirements TEXT NOT NULL,
        benefits TEXT,
        remote_allowed BOOLEAN NOT NULL DEFAULT FALSE,
        status TEXT NOT NULL DEFAULT 'DRAFT',
        minimum_experience INTEGER NOT NULL DEFAULT 0,
        preferred_education TEXT,
        role_level TEXT NOT NULL DEFAULT 'mid',
        required_skills TEXT NOT NULL DEFAULT '[]',
        preferred_skills TEXT NOT NULL DEFAULT '[]',
        company_name TEXT,
        source_url TEXT,
        extracted_at TEXT,
        extraction_method TEXT NOT NULL DEFAULT 'MANUAL',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        posted_at TEXT,
        closes_at TEXT,
        created_by TEXT
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_job_postings_status ON job_postings(status);",
    r#"
    CREATE TABLE IF NOT EXISTS applications (
        submission_id TEXT PRIMARY KEY,
        candidate_name TEXT NOT NULL,
        candidate_email TEXT NOT NULL,
        candidate_description TEXT NOT NULL DEFAULT '',
        file_names TEXT NOT NULL DEFAULT '[]',
        status TEXT NOT NULL DEFAULT 'SUBMITTED',
        submitted_at TEXT NOT NULL,
        processed_at TEXT,
        job_posting_id TEXT REFERENCES job_postings(id) ON DELETE SET NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);",
    "CREATE INDEX IF NOT EXISTS idx_applications_submitted_at ON applications(submitted_at);",
    r#"
    CREATE TABLE IF NOT EXISTS candidate_profiles (
        submission_id TEXT PRIMARY KEY REFERENCES applications(submission_id) ON DELETE CASCADE,
        years_of_experience REAL NOT NULL,
        education_level TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analysis_results (
        submission_id TEXT PRIMARY KEY REFERENCES applications(submission_id) ON DELETE CASCADE,
        technical_skills_score REAL NOT NULL,
        experience_score REAL NOT NULL,
        education_score REAL NOT NULL,
        overall_fit REAL NOT NULL,
        data TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS decision_results (
        submission_id TEXT PRIMARY KEY REFERENCES applications(submission_id) ON DELETE CASCADE,
        recommendation TEXT NOT NULL,
        confidence REAL NOT NULL,
        data TEXT NOT NULL,
        job_requirements TEXT NOT NULL,
        scheduled_meeting TEXT,
        processed_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS queue_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        payload TEXT NOT NULL,
        state TEXT NOT NULL DEFAULT 'waiting',
        priority INTEGER NOT NULL DEFAULT 0,
        attempts_made INTEGER NOT NULL DEFAULT 0,
        max_attempts INTEGER NOT NULL DEFAULT 3,
        backoff_ms INTEGER NOT NULL DEFAULT 2000,
        run_at INTEGER NOT NULL,
        locked_until INTEGER,
        progress INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        finished_at INTEGER
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_queue_jobs_due ON queue_jobs(state, priority, run_at);",
];
