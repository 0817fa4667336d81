//! PostgREST-style hosted table (Supabase and friends).
//!
//! The table needs a unique constraint on `user_id`; registration relies on
//! `on_conflict` plus `resolution=ignore-duplicates` for idempotence.

use super::RecipientStore;
use crate::config::{RestStoreConfig, StoreBackend};
use crate::models::Recipient;
use async_trait::async_trait;
use relay_core::error::AppError;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};

pub struct RestRecipientStore {
    client: Client,
    table_url: String,
    api_key: Secret<String>,
}

impl RestRecipientStore {
    pub fn new(client: Client, config: &RestStoreConfig) -> Result<Self, AppError> {
        if config.url.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATASTORE_URL is required for the rest store backend"
            )));
        }

        Ok(Self {
            client,
            table_url: format!(
                "{}/rest/v1/{}",
                config.url.trim_end_matches('/'),
                config.table
            ),
            api_key: config.api_key.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    async fn check(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %body, "Datastore {} failed", operation);
        Err(AppError::StoreUnavailable(format!(
            "datastore {} returned status {}",
            operation,
            status.as_u16()
        )))
    }
}

fn request_failed(operation: &str, err: reqwest::Error) -> AppError {
    tracing::error!("Datastore {} request failed: {}", operation, err);
    AppError::StoreUnavailable(format!("datastore {} failed: {}", operation, err))
}

#[async_trait]
impl RecipientStore for RestRecipientStore {
    async fn register(&self, user_id: &str) -> Result<(), AppError> {
        let response = self
            .authorized(self.client.post(&self.table_url))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&[Recipient::new(user_id)])
            .send()
            .await
            .map_err(|e| request_failed("insert", e))?;

        Self::check(response, "insert").await?;
        tracing::debug!(user_id = %user_id, "Recipient registered");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>, AppError> {
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(&[("select", "user_id")])
            .send()
            .await
            .map_err(|e| request_failed("select", e))?;

        let rows: Vec<Recipient> = Self::check(response, "select")
            .await?
            .json()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("malformed datastore rows: {}", e)))?;

        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(&[("select", "user_id"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| request_failed("health check", e))?;

        Self::check(response, "health check").await.map(|_| ())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RestRecipientStore {
        RestRecipientStore::new(
            Client::new(),
            &RestStoreConfig {
                url: server.uri(),
                api_key: Secret::new("service-key".to_string()),
                table: "recipients".to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn register_upserts_with_ignore_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/recipients"))
            .and(query_param("on_conflict", "user_id"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(header_exists("prefer"))
            .and(body_json(json!([{ "user_id": "U1" }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let store = store(&server);
        store.register("U1").await.unwrap();
        store.register("U1").await.unwrap();
    }

    #[tokio::test]
    async fn list_all_returns_user_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/recipients"))
            .and(query_param("select", "user_id"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "user_id": "U1" }, { "user_id": "U2" }])),
            )
            .mount(&server)
            .await;

        let mut ids = store(&server).list_all().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["U1".to_string(), "U2".to_string()]);
    }

    #[tokio::test]
    async fn error_status_is_store_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        assert!(matches!(
            store(&server).list_all().await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(store(&server).health_check().await.is_err());
    }

    #[test]
    fn missing_url_is_config_error() {
        let result = RestRecipientStore::new(
            Client::new(),
            &RestStoreConfig {
                url: String::new(),
                api_key: Secret::new(String::new()),
                table: "recipients".to_string(),
            },
        );
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
