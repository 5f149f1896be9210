//! SQLite Code Store
//!
//! Runtime queries (no compile-time `DATABASE_URL` required). The pool is
//! capped at one connection; SQLite permits a single writer and the
//! gateway's write volume is a trickle, so the cap trades nothing for
//! freedom from "database is locked" errors.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kg_common::{AssetRef, Code, CodeMapping, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::{error, info};

use super::{CodeStore, StoreError};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            StoreError::from(e)
        }
    };
}

#[derive(FromRow)]
struct CodeMappingRow {
    code: String,
    title: String,
    asset_ref: String,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<CodeMappingRow> for CodeMapping {
    fn from(row: CodeMappingRow) -> Self {
        Self {
            code: Code::new(row.code),
            title: row.title,
            asset_ref: AssetRef::new(row.asset_ref),
            created_by: UserId(row.created_by),
            created_at: row.created_at,
        }
    }
}

/// Code store backed by a SQLite database file.
pub struct SqliteCodeStore {
    pool: SqlitePool,
}

impl SqliteCodeStore {
    /// Open the database at `path`, creating it if missing, and bring the
    /// schema up to date.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{path}?mode=rwc"))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevents transient "database is locked" errors under
            // concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        info!(path, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Wrap an already-migrated pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeStore for SqliteCodeStore {
    async fn lookup(&self, code: &Code) -> Result<Option<CodeMapping>, StoreError> {
        let row = sqlx::query_as::<_, CodeMappingRow>("SELECT * FROM code_mappings WHERE code = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("lookup_code", code = %code))?;

        Ok(row.map(CodeMapping::from))
    }

    async fn insert(&self, mapping: &CodeMapping) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO code_mappings (code, title, asset_ref, created_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(code) DO NOTHING
            ",
        )
        .bind(mapping.code.as_str())
        .bind(&mapping.title)
        .bind(mapping.asset_ref.as_str())
        .bind(mapping.created_by.0)
        .bind(mapping.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error!("insert_code", code = %mapping.code))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, code: &Code) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM code_mappings WHERE code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error!("remove_code", code = %code))?;

        Ok(result.rows_affected() > 0)
    }
}
