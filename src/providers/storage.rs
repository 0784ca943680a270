use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage rejected the request: {0}")]
    Rejected(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

/// Object storage holding uploaded proof files. Objects are publicly
/// readable through `public_url`; writes and deletes require the service
/// key.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    fn public_url(&self, key: &str) -> String;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Bucketed HTTP object-storage client.
pub struct HttpObjectStorage {
    base_url: String,
    bucket: String,
    service_key: SecretString,
    client: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, key)
    }

    async fn error_from_response(response: reqwest::Response) -> StorageError {
        let status = response.status();
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| format!("HTTP {status}"));

        if status.is_client_error() {
            StorageError::Rejected(detail)
        } else {
            StorageError::Unavailable(detail)
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(self.service_key.expose_secret())
            .header("content-type", content_type.to_string())
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(self.service_key.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }
}
