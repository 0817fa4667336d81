use super::RecipientStore;
use crate::config::StoreBackend;
use crate::models::Recipient;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{FindOptions, IndexOptions, UpdateOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use relay_core::error::AppError;

const COLLECTION: &str = "recipients";

#[derive(Clone)]
pub struct MongoRecipientStore {
    client: MongoClient,
    db: Database,
}

impl MongoRecipientStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let user_id_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_id_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.recipients()
            .create_index(user_id_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user_id index: {}", e);
                AppError::from(e)
            })?;

        tracing::info!("Successfully created MongoDB indexes");
        Ok(())
    }

    fn recipients(&self) -> Collection<Recipient> {
        self.db.collection(COLLECTION)
    }
}

#[async_trait]
impl RecipientStore for MongoRecipientStore {
    async fn register(&self, user_id: &str) -> Result<(), AppError> {
        let update = doc! {
            "$setOnInsert": {
                "user_id": user_id,
                "created_utc": BsonDateTime::now(),
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();

        let result = self
            .recipients()
            .update_one(doc! { "user_id": user_id }, update, options)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, "Failed to register recipient: {}", e);
                AppError::from(e)
            })?;

        tracing::debug!(
            user_id = %user_id,
            inserted = result.upserted_id.is_some(),
            "Recipient registered"
        );
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>, AppError> {
        let options = FindOptions::builder()
            .projection(doc! { "_id": 0, "user_id": 1 })
            .build();

        let cursor = self.recipients().find(None, options).await.map_err(|e| {
            tracing::error!("Failed to list recipients: {}", e);
            AppError::from(e)
        })?;

        let recipients: Vec<Recipient> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to read recipient cursor: {}", e);
            AppError::from(e)
        })?;

        Ok(recipients.into_iter().map(|r| r.user_id).collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Mongo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mongo_uri() -> String {
        std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running MongoDB (MONGODB_URI)"]
    async fn register_is_idempotent_and_list_all_returns_ids() {
        let database = format!("notify_relay_test_{}", chrono::Utc::now().timestamp_millis());
        let store = MongoRecipientStore::connect(&mongo_uri(), &database)
            .await
            .unwrap();
        store.initialize_indexes().await.unwrap();

        store.register("U1").await.unwrap();
        store.register("U1").await.unwrap();
        store.register("U2").await.unwrap();

        let mut ids = store.list_all().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["U1".to_string(), "U2".to_string()]);
        assert!(store.health_check().await.is_ok());

        store.db.drop(None).await.unwrap();
    }
}
