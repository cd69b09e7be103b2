//! Repository layer for the local SQLite store.

use crate::cache::CacheEntry;
use crate::domain::{Address, TimeMs};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Cache entries
    // =========================================================================

    /// Load a cache entry regardless of its age.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored value is not valid JSON.
    pub async fn get_cache_entry(&self, key: &str) -> Result<Option<CacheEntry>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT value, stored_at_ms, ttl_minutes
            FROM cache_entries
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("value");
        let value = serde_json::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let ttl_minutes: i64 = row.get("ttl_minutes");

        Ok(Some(CacheEntry::new(
            value,
            TimeMs::new(row.get("stored_at_ms")),
            u32::try_from(ttl_minutes).unwrap_or(0),
        )))
    }

    /// Insert or replace a cache entry.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn put_cache_entry(&self, key: &str, entry: &CacheEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, stored_at_ms, ttl_minutes)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                stored_at_ms = excluded.stored_at_ms,
                ttl_minutes = excluded.ttl_minutes
            "#,
        )
        .bind(key)
        .bind(entry.value.to_string())
        .bind(entry.stored_at.as_ms())
        .bind(i64::from(entry.ttl_minutes))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_cache_entry(&self, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every entry whose lifetime ended at or before `now`.
    ///
    /// Returns the number of rows removed.
    pub async fn purge_expired_cache_entries(&self, now: TimeMs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM cache_entries WHERE stored_at_ms + ttl_minutes * 60000 <= ?",
        )
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Wallet session
    // =========================================================================

    pub async fn load_wallet(&self) -> Result<Option<Address>, sqlx::Error> {
        let row = sqlx::query("SELECT address FROM wallet_session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Address::new(r.get("address"))))
    }

    pub async fn save_wallet(&self, address: &Address, connected_at: TimeMs) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO wallet_session (id, address, connected_at_ms)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                address = excluded.address,
                connected_at_ms = excluded.connected_at_ms
            "#,
        )
        .bind(address.as_str())
        .bind(connected_at.as_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_wallet(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM wallet_session WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_cache_entry_upsert_and_load() {
        let (repo, _temp) = setup_repo().await;
        let first = CacheEntry::new(serde_json::json!({"balance": 1}), TimeMs::new(100), 5);
        let second = CacheEntry::new(serde_json::json!({"balance": 2}), TimeMs::new(200), 10);

        repo.put_cache_entry("k", &first).await.unwrap();
        repo.put_cache_entry("k", &second).await.unwrap();

        let loaded = repo.get_cache_entry("k").await.unwrap();
        assert_eq!(loaded, Some(second));
        assert_eq!(repo.get_cache_entry("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_cache_entry() {
        let (repo, _temp) = setup_repo().await;
        let entry = CacheEntry::new(serde_json::json!(1), TimeMs::new(0), 5);
        repo.put_cache_entry("k", &entry).await.unwrap();

        assert!(repo.delete_cache_entry("k").await.unwrap());
        assert!(!repo.delete_cache_entry("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired_cache_entries() {
        let (repo, _temp) = setup_repo().await;
        let stale = CacheEntry::new(serde_json::json!(1), TimeMs::new(0), 1);
        let fresh = CacheEntry::new(serde_json::json!(2), TimeMs::new(0), 10);
        repo.put_cache_entry("stale", &stale).await.unwrap();
        repo.put_cache_entry("fresh", &fresh).await.unwrap();

        let removed = repo
            .purge_expired_cache_entries(TimeMs::new(60_000))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_cache_entry("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wallet_session_persistence() {
        let (repo, _temp) = setup_repo().await;
        assert_eq!(repo.load_wallet().await.unwrap(), None);

        repo.save_wallet(&Address::new("0xa".to_string()), TimeMs::new(1))
            .await
            .unwrap();
        repo.save_wallet(&Address::new("0xb".to_string()), TimeMs::new(2))
            .await
            .unwrap();
        assert_eq!(
            repo.load_wallet().await.unwrap(),
            Some(Address::new("0xb".to_string()))
        );

        repo.clear_wallet().await.unwrap();
        assert_eq!(repo.load_wallet().await.unwrap(), None);
    }
}
