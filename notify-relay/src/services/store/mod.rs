//! Recipient persistence.
//!
//! Every backend offers the same three operations. Registration is an
//! insert-or-ignore keyed on the LINE user id, so replays of a follow event
//! never create duplicates.

pub mod memory;
pub mod mongo;
pub mod rest;

use crate::config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use relay_core::error::AppError;
use reqwest::Client;
use std::sync::Arc;

pub use memory::MemoryRecipientStore;
pub use mongo::MongoRecipientStore;
pub use rest::RestRecipientStore;

#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Insert the user id unless it is already present.
    async fn register(&self, user_id: &str) -> Result<(), AppError>;

    /// Every registered user id, in no particular order.
    async fn list_all(&self) -> Result<Vec<String>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    fn backend(&self) -> StoreBackend;
}

/// Build the configured backend. Mongo connects and creates its index here.
pub async fn connect(
    config: &StoreConfig,
    client: Client,
) -> Result<Arc<dyn RecipientStore>, AppError> {
    let store: Arc<dyn RecipientStore> = match config.backend {
        StoreBackend::Rest => Arc::new(RestRecipientStore::new(client, &config.rest)?),
        StoreBackend::Mongo => {
            let store =
                MongoRecipientStore::connect(&config.mongodb.uri, &config.mongodb.database)
                    .await?;
            store.initialize_indexes().await?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory recipient store; registrations are lost on restart");
            Arc::new(MemoryRecipientStore::new())
        }
    };

    tracing::info!(backend = %config.backend, "Recipient store ready");
    Ok(store)
}
