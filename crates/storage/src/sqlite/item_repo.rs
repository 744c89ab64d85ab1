use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{ItemRepository, StorageError};

use super::SqliteRepository;

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl ItemRepository for SqliteRepository {
    async fn load_items(&self) -> Result<Vec<(String, String)>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT key, value
            FROM storage_items
            ORDER BY key ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| -> Result<(String, String), StorageError> {
                let key: String = row.try_get("key").map_err(ser)?;
                let value: String = row.try_get("value").map_err(ser)?;
                Ok((key, value))
            })
            .collect()
    }

    async fn put_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storage_items (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM storage_items WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn clear_items(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM storage_items")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
