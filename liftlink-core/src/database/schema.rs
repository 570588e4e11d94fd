//! Database schema and migrations
//!
//! This module handles database initialization and schema migrations.
//! Uses SQLite with WAL mode for better concurrency and crash safety.

use crate::config::DEFAULT_EXERCISES;
use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize database with schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing database schema");

    // Enable WAL mode for better performance and crash safety
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Create migrations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Get current version
    let current_version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    tracing::info!("Current database version: {}", current_version);

    // Apply migrations
    apply_migrations(pool, current_version).await?;

    // Make sure a fresh install has something to autocomplete from
    seed_default_exercises(pool).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32) -> Result<()> {
    let migrations = get_migrations();

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Applying migration version {}", version);

            // Execute migration in a transaction
            let mut tx = pool.begin().await?;

            // Run migration SQL
            for statement in sql.split(";").filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            // Record migration
            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

/// Insert the default exercise catalog.
///
/// Runs on every initialization. Insert-if-absent keeps it a no-op for
/// names already present, including ones the user created themselves.
async fn seed_default_exercises(pool: &SqlitePool) -> Result<()> {
    for name in DEFAULT_EXERCISES {
        sqlx::query("INSERT OR IGNORE INTO exercises (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![
        (1, include_str!("migrations/001_initial_schema.sql")),
        (2, include_str!("migrations/002_exercise_catalog.sql")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_initialize_database() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        // All migrations should be recorded
        let version: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let foreign_keys: i32 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(foreign_keys, 1);
    }

    #[tokio::test]
    async fn test_initialize_twice_is_noop() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        sqlx::query("INSERT INTO programs (name) VALUES ('Push Pull Legs')")
            .execute(&pool)
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let programs: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM programs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(programs, 1);

        // Seeding must not duplicate either
        let seeded: i32 =
            sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE name = 'Barbell Squat'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(seeded, 1);
    }

    #[tokio::test]
    async fn test_upgrade_backfills_legacy_sets() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        // Build a version 1 database by hand: apply only the first
        // migration and record it, the way an old install would look.
        sqlx::query(
            "CREATE TABLE migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let (_, v1_sql) = get_migrations()[0];
        for statement in v1_sql.split(";").filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        sqlx::query("INSERT INTO migrations (version) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("INSERT INTO programs (name) VALUES ('Old Program')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO workouts (program_id, name, is_entry) VALUES (1, 'Day 1', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO sets (workout_id, exercise_name, weight, reps, is_entry) VALUES (1, 'Zercher Squat', 100, 5, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        initialize_database(&pool).await.unwrap();

        // The legacy row now points at a catalog entry
        let exercise_id: Option<i64> =
            sqlx::query_scalar("SELECT exercise_id FROM sets WHERE id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(exercise_id.is_some());

        let name: String = sqlx::query_scalar("SELECT name FROM exercises WHERE id = ?")
            .bind(exercise_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name, "Zercher Squat");
    }
}
