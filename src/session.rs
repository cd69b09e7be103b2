//! Connected-wallet session shared by every wallet-scoped component.
//!
//! A single `WalletSession` handle is created at startup and cloned into the
//! aggregator, the position cache and the HTTP state. When backed by a
//! [`Repository`] the connected address survives restarts.

use crate::clock::Clock;
use crate::db::Repository;
use crate::domain::Address;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone)]
pub struct WalletSession {
    wallet: Arc<RwLock<Option<Address>>>,
    repo: Option<Arc<Repository>>,
    clock: Arc<dyn Clock>,
}

impl WalletSession {
    /// A session that lives only as long as the process.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            wallet: Arc::new(RwLock::new(None)),
            repo: None,
            clock,
        }
    }

    /// A persisted session, restored from the repository.
    pub async fn restore(repo: Arc<Repository>, clock: Arc<dyn Clock>) -> Result<Self, sqlx::Error> {
        let wallet = repo.load_wallet().await?;
        if let Some(wallet) = &wallet {
            info!("Restored wallet session for {}", wallet);
        }
        Ok(Self {
            wallet: Arc::new(RwLock::new(wallet)),
            repo: Some(repo),
            clock,
        })
    }

    pub async fn current(&self) -> Option<Address> {
        self.wallet.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.wallet.read().await.is_some()
    }

    /// Connect `wallet`, replacing any previously connected address.
    ///
    /// # Errors
    /// Returns an error if the session cannot be persisted; the in-memory session
    /// is left unchanged in that case.
    pub async fn connect(&self, wallet: Address) -> Result<(), sqlx::Error> {
        let mut current = self.wallet.write().await;
        if let Some(repo) = &self.repo {
            repo.save_wallet(&wallet, self.clock.now()).await?;
        }
        info!("Wallet connected: {}", wallet);
        *current = Some(wallet);
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), sqlx::Error> {
        let mut current = self.wallet.write().await;
        if let Some(repo) = &self.repo {
            repo.clear_wallet().await?;
        }
        if let Some(previous) = current.take() {
            info!("Wallet disconnected: {}", previous);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::init_db;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_session() {
        let session = WalletSession::in_memory(Arc::new(SystemClock));
        assert_eq!(session.current().await, None);

        session.connect(Address::new("0xa".to_string())).await.unwrap();
        assert!(session.is_connected().await);

        let clone = session.clone();
        assert_eq!(clone.current().await, Some(Address::new("0xa".to_string())));

        clone.disconnect().await.unwrap();
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_persisted_session_is_restored() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("session.db")
            .to_string_lossy()
            .to_string();

        let repo = Arc::new(Repository::new(init_db(&db_path).await.unwrap()));
        let session = WalletSession::restore(repo.clone(), Arc::new(SystemClock))
            .await
            .unwrap();
        assert_eq!(session.current().await, None);
        session.connect(Address::new("0xabc".to_string())).await.unwrap();

        let restored = WalletSession::restore(repo.clone(), Arc::new(SystemClock))
            .await
            .unwrap();
        assert_eq!(restored.current().await, Some(Address::new("0xabc".to_string())));

        restored.disconnect().await.unwrap();
        let after = WalletSession::restore(repo, Arc::new(SystemClock)).await.unwrap();
        assert_eq!(after.current().await, None);
    }
}
