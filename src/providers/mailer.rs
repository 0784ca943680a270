use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::EmailConfig;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("RESEND_API_KEY not configured")]
    NotConfigured,

    #[error("email provider error: {0}")]
    Send(String),
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Send(err.to_string())
    }
}

/// Transactional email provider. Sending is always a best-effort side
/// effect; callers report failures, they never propagate them.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the provider-assigned message id.
    async fn send(&self, email: &Email) -> Result<String, MailError>;
}

pub struct ResendMailer {
    api_key: Option<SecretString>,
    from: String,
    reply_to: String,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            reply_to: config.reply_to.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<String, MailError> {
        let api_key = self.api_key.as_ref().ok_or(MailError::NotConfigured)?;

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key.expose_secret())
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "reply_to": self.reply_to,
                "subject": email.subject,
                "text": email.text,
                "html": email.html,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(MailError::Send(detail));
        }

        let payload = response.json::<SendResponse>().await?;
        Ok(payload.id)
    }
}
