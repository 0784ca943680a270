use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::db::models::Role;

/// Authenticated identity as reported by the external provider.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid or expired access token")]
    InvalidToken,

    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Unavailable(err.to_string())
    }
}

/// External identity provider. The provider is the final authority on
/// principals; the local `profiles` table is only a mirror.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a principal with its email pre-confirmed (no confirmation
    /// mail goes out; credentials are delivered by the provisioning flow).
    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
        role: Role,
    ) -> Result<Principal, IdentityError>;

    async fn user_from_token(&self, token: &str) -> Result<Principal, IdentityError>;

    async fn update_email(&self, id: Uuid, new_email: &str) -> Result<(), IdentityError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError>;
}

/// GoTrue-style auth admin API client.
pub struct HttpIdentity {
    base_url: String,
    service_key: SecretString,
    client: reqwest::Client,
}

impl HttpIdentity {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn admin_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
    }

    async fn error_from_response(response: reqwest::Response) -> IdentityError {
        let status = response.status();
        let detail = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                ["msg", "message", "error_description", "error"]
                    .iter()
                    .find_map(|key| body.get(key).and_then(|v| v.as_str()).map(String::from))
            })
            .unwrap_or_else(|| format!("HTTP {status}"));

        if status.is_client_error() {
            IdentityError::Rejected(detail)
        } else {
            IdentityError::Unavailable(detail)
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    email: Option<String>,
    user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    name: Option<String>,
}

impl From<UserPayload> for Principal {
    fn from(payload: UserPayload) -> Self {
        Principal {
            id: payload.id,
            email: payload.email.unwrap_or_default(),
            name: payload.user_metadata.and_then(|m| m.name),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentity {
    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
        role: Role,
    ) -> Result<Principal, IdentityError> {
        let response = self
            .admin_request(reqwest::Method::POST, "/admin/users")
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
                "email_confirm": true,
                "user_metadata": { "name": name, "role": role },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let payload = response.json::<UserPayload>().await?;
        Ok(payload.into())
    }

    async fn user_from_token(&self, token: &str) -> Result<Principal, IdentityError> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::InvalidToken),
            status if status.is_success() => {
                let payload = response.json::<UserPayload>().await?;
                Ok(payload.into())
            }
            _ => Err(Self::error_from_response(response).await),
        }
    }

    async fn update_email(&self, id: Uuid, new_email: &str) -> Result<(), IdentityError> {
        let response = self
            .admin_request(reqwest::Method::PUT, &format!("/admin/users/{id}"))
            // email_confirm bypasses the confirmation round trip
            .json(&json!({ "email": new_email, "email_confirm": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let response = self
            .admin_request(reqwest::Method::DELETE, &format!("/admin/users/{id}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }
}
