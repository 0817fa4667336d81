use super::RecipientStore;
use crate::config::StoreBackend;
use async_trait::async_trait;
use relay_core::error::AppError;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-process recipient set for development and tests.
pub struct MemoryRecipientStore {
    recipients: RwLock<BTreeSet<String>>,
    write_attempts: AtomicU64,
    available: AtomicBool,
}

impl Default for MemoryRecipientStore {
    fn default() -> Self {
        Self {
            recipients: RwLock::new(BTreeSet::new()),
            write_attempts: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipients<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recipients: RwLock::new(recipients.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Number of `register` calls, successful or not.
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Simulate the datastore going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.recipients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.recipients.read().await.is_empty()
    }

    fn ensure_available(&self) -> Result<(), AppError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl RecipientStore for MemoryRecipientStore {
    async fn register(&self, user_id: &str) -> Result<(), AppError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let inserted = self.recipients.write().await.insert(user_id.to_string());
        tracing::debug!(user_id = %user_id, inserted, "Recipient registered in memory");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>, AppError> {
        self.ensure_available()?;
        Ok(self.recipients.read().await.iter().cloned().collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.ensure_available()
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registering_twice_leaves_one_record() {
        let store = MemoryRecipientStore::new();
        store.register("U1").await.unwrap();
        store.register("U1").await.unwrap();

        assert_eq!(store.list_all().await.unwrap(), vec!["U1".to_string()]);
        assert_eq!(store.write_attempts(), 2);
    }

    #[tokio::test]
    async fn concurrent_registrations_of_one_id_collapse() {
        let store = std::sync::Arc::new(MemoryRecipientStore::new());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.register("U-same").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = MemoryRecipientStore::with_recipients(["U1", "U2"]);
        store.set_available(false);

        assert!(matches!(
            store.register("U3").await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(store.list_all().await.is_err());
        assert!(store.health_check().await.is_err());

        store.set_available(true);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }
}
