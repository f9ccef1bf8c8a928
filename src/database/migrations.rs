//! # Database Migration System
//!
//! Incremental SQL migrations with version tracking.
//!
//! ## Concurrency Control
//!
//! Several processes may start against the same database at once. The runner
//! takes a PostgreSQL advisory lock on a single pooled connection, applies the
//! outstanding migrations on that connection and releases the lock:
//!
//! ```sql
//! SELECT pg_advisory_lock(7314251907110001)
//! ```
//!
//! Whoever waits on the lock finds the migrations already recorded and applies
//! nothing.
//!
//! ## Migration Discovery
//!
//! Files in the migrations directory named `YYYYMMDDHHMMSS_description.sql`
//! are applied in version order, each in its own transaction together with
//! its row in `courier_schema_migrations`.

use sqlx::{PgConnection, PgPool, Row};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};

/// Lock key shared by every migration runner of this schema
const MIGRATION_LOCK_KEY: i64 = 7_314_251_907_110_001;

pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// A single migration file
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version timestamp (YYYYMMDDHHMMSS format)
    pub version: String,
    /// Human-readable migration name
    pub name: String,
    pub path: PathBuf,
}

/// Applies schema migrations under an advisory lock
pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Apply outstanding migrations from `./migrations`
    pub async fn run_all(pool: &PgPool) -> StoreResult<Vec<Migration>> {
        Self::run_from_directory(pool, Path::new(DEFAULT_MIGRATIONS_DIR)).await
    }

    /// Apply outstanding migrations from `directory`, returning the ones applied
    pub async fn run_from_directory(pool: &PgPool, directory: &Path) -> StoreResult<Vec<Migration>> {
        let migrations = Self::discover_migrations(directory)?;
        let mut conn = pool.acquire().await?;

        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let result = Self::apply_outstanding(&mut conn, migrations).await;

        // Released even when a migration failed
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        result
    }

    async fn apply_outstanding(
        conn: &mut PgConnection,
        migrations: BTreeMap<String, Migration>,
    ) -> StoreResult<Vec<Migration>> {
        Self::ensure_migration_table(conn).await?;
        let applied = Self::get_applied_migrations(conn).await?;

        let mut newly_applied = Vec::new();
        for migration in migrations.into_values() {
            if applied.contains(&migration.version) {
                debug!(version = %migration.version, "migration already applied");
                continue;
            }
            info!(version = %migration.version, name = %migration.name, "Applying migration");
            Self::run_migration(conn, &migration).await?;
            newly_applied.push(migration);
        }
        Ok(newly_applied)
    }

    /// All migration files in `directory`, keyed by version
    pub fn discover_migrations(directory: &Path) -> StoreResult<BTreeMap<String, Migration>> {
        if !directory.is_dir() {
            return Err(StoreError::Migration(format!(
                "migrations directory {} not found",
                directory.display()
            )));
        }

        let entries = fs::read_dir(directory)
            .map_err(|e| StoreError::Migration(format!("cannot read {}: {e}", directory.display())))?;

        let mut migrations = BTreeMap::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StoreError::Migration(e.to_string()))?
                .path();
            if !path.is_file() || path.extension().map(|ext| ext != "sql").unwrap_or(true) {
                continue;
            }
            let Some((version, name)) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(Self::parse_migration_filename)
            else {
                continue;
            };
            migrations.insert(version.clone(), Migration { version, name, path });
        }
        Ok(migrations)
    }

    /// `YYYYMMDDHHMMSS_migration_name` into version and readable name
    fn parse_migration_filename(filename: &str) -> Option<(String, String)> {
        if filename.len() < 15 || !filename.is_char_boundary(14) {
            return None;
        }
        let (version, name) = filename.split_at(14);
        if !version.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let name = name.strip_prefix('_').unwrap_or(name).replace('_', " ");
        Some((version.to_string(), name))
    }

    async fn ensure_migration_table(conn: &mut PgConnection) -> StoreResult<()> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS courier_schema_migrations (
                version VARCHAR(14) PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn get_applied_migrations(conn: &mut PgConnection) -> StoreResult<HashSet<String>> {
        let rows = sqlx::query("SELECT version FROM courier_schema_migrations")
            .fetch_all(&mut *conn)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("version").map_err(StoreError::from))
            .collect()
    }

    async fn run_migration(conn: &mut PgConnection, migration: &Migration) -> StoreResult<()> {
        let sql = fs::read_to_string(&migration.path).map_err(|e| {
            StoreError::Migration(format!("cannot read {}: {e}", migration.path.display()))
        })?;

        let mut tx = sqlx::Connection::begin(&mut *conn).await?;
        sqlx::raw_sql(&sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO courier_schema_migrations (version) VALUES ($1)")
            .bind(&migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
