//! SQLite-backed repository for user preferences.

use sqlx::SqlitePool;

use crate::persistence::traits::PreferenceRepository;
use crate::persistence::PersistenceError;

/// SQLite implementation of [`PreferenceRepository`].
pub struct SqlitePreferenceRepository {
    pool: SqlitePool,
}

impl SqlitePreferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PreferenceRepository for SqlitePreferenceRepository {
    async fn get_preference(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_preference(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        sqlx::query("INSERT OR REPLACE INTO preferences (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_preference(&self, key: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_preferences(&self) -> Result<Vec<(String, String)>, PersistenceError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM preferences ORDER BY key")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}
