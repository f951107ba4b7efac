//! # Database Migrations
//!
//! Embedded schema migrations for SQLite.
//!
//! ## How It Works
//! `sqlx::migrate!` embeds every file under `migrations/sqlite/` into the
//! binary at compile time. On startup the migrator compares the embedded
//! set against the `_sqlx_migrations` table and applies what's missing, in
//! filename order. Applied migrations are never edited; schema changes are
//! new numbered files.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Embedded migrations, resolved relative to this crate's manifest.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies any pending migrations. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(
        embedded = MIGRATOR.iter().count(),
        "Applying pending migrations"
    );
    MIGRATOR.run(pool).await?;
    info!("Schema is up to date");
    Ok(())
}

/// Returns the applied migration versions, oldest first.
pub async fn applied_versions(pool: &SqlitePool) -> DbResult<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT version FROM _sqlx_migrations ORDER BY version")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(v,)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_all_migrations_apply() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let versions = applied_versions(db.pool()).await.unwrap();
        assert_eq!(versions.len(), MIGRATOR.iter().count());
    }
}
