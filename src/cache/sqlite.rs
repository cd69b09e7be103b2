use super::{CacheEntry, CacheError, CacheStore};
use crate::db::Repository;
use async_trait::async_trait;
use std::sync::Arc;

/// Cache store persisted in the local SQLite database, so entries survive restarts.
#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    repo: Arc<Repository>,
}

impl SqliteCacheStore {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.repo.get_cache_entry(key).await?)
    }

    async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        Ok(self.repo.put_cache_entry(key, &entry).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.repo.delete_cache_entry(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::clock::ManualClock;
    use crate::db::init_db;
    use crate::domain::TimeMs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_entries_survive_new_store_instance() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("cache.db")
            .to_string_lossy()
            .to_string();
        let clock = Arc::new(ManualClock::new(TimeMs::new(0)));

        let pool = init_db(&db_path).await.unwrap();
        let cache = Cache::new(
            Arc::new(SqliteCacheStore::new(Arc::new(Repository::new(pool)))),
            clock.clone(),
        );
        cache.set("user_position_0xw_0xp", &"42", 5).await;

        let pool = init_db(&db_path).await.unwrap();
        let reopened = Cache::new(
            Arc::new(SqliteCacheStore::new(Arc::new(Repository::new(pool)))),
            clock.clone(),
        );
        assert_eq!(
            reopened.get::<String>("user_position_0xw_0xp").await.as_deref(),
            Some("42")
        );

        clock.advance_minutes(5);
        assert_eq!(reopened.get::<String>("user_position_0xw_0xp").await, None);
    }
}
