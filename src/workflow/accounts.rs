use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::EmailConfig;
use crate::db::models::{NewAccount, NewProfile, Role};
use crate::db::repositories::{ProfileRepository, ProgressRepository};
use crate::db::DatabaseError;
use crate::error::AppResult;
use crate::providers::{Email, IdentityProvider, Mailer};

/// App-side rows tied to a principal: the profile mirror and the derived
/// progress records. All writes here are secondary effects.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn upsert_profile(&self, profile: &NewProfile) -> Result<(), DatabaseError>;

    async fn update_profile_email(&self, id: Uuid, email: &str) -> Result<(), DatabaseError>;

    async fn delete_profile(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn delete_progress(&self, user_id: Uuid) -> Result<(), DatabaseError>;
}

#[async_trait]
impl DirectoryStore for PgPool {
    async fn upsert_profile(&self, profile: &NewProfile) -> Result<(), DatabaseError> {
        ProfileRepository::upsert(self, profile).await.map(|_| ())
    }

    async fn update_profile_email(&self, id: Uuid, email: &str) -> Result<(), DatabaseError> {
        ProfileRepository::update_email(self, id, email).await
    }

    async fn delete_profile(&self, id: Uuid) -> Result<(), DatabaseError> {
        ProfileRepository::delete(self, id).await
    }

    async fn delete_progress(&self, user_id: Uuid) -> Result<(), DatabaseError> {
        ProgressRepository::delete_for_user(self, user_id).await
    }
}

/// Outcome of the credentials email, reported alongside the otherwise
/// successful account creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailOutcome {
    #[serde(rename = "emailSent")]
    pub sent: bool,
    #[serde(rename = "emailError")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedAccount {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(flatten)]
    pub email_outcome: EmailOutcome,
}

/// Create a learner identity with email pre-confirmed, then run the
/// secondary effects: mirror the profile and send the credentials email.
/// The operation succeeds once the identity exists; each secondary-effect
/// failure is logged and reported, never fatal.
pub async fn provision(
    identity: &dyn IdentityProvider,
    store: &dyn DirectoryStore,
    mailer: &dyn Mailer,
    email_config: &EmailConfig,
    account: &NewAccount,
) -> AppResult<ProvisionedAccount> {
    account.validate()?;

    let principal = identity
        .create_user(&account.email, &account.password, &account.name, account.role)
        .await?;

    let profile = NewProfile {
        id: principal.id,
        email: account.email.clone(),
        name: account.name.clone(),
        role: account.role,
    };
    if let Err(err) = store.upsert_profile(&profile).await {
        warn!(user_id = %principal.id, error = %err, "failed to mirror profile after account creation");
    }

    let email = welcome_email(
        &account.name,
        &account.email,
        &account.password,
        &email_config.app_base_url,
    );
    let email_outcome = match mailer.send(&email).await {
        Ok(message_id) => {
            info!(%message_id, to = %account.email, "credentials email sent");
            EmailOutcome {
                sent: true,
                error: None,
            }
        }
        Err(err) => {
            warn!(to = %account.email, error = %err, "failed to send credentials email");
            EmailOutcome {
                sent: false,
                error: Some(err.to_string()),
            }
        }
    };

    Ok(ProvisionedAccount {
        id: principal.id,
        email: account.email.clone(),
        name: account.name.clone(),
        role: account.role,
        email_outcome,
    })
}

/// Remove a principal. Dependent rows go first since the identity provider
/// is the final authority, but their failures are tolerated: the identity
/// delete proceeds regardless.
pub async fn remove(
    identity: &dyn IdentityProvider,
    store: &dyn DirectoryStore,
    id: Uuid,
) -> AppResult<()> {
    if let Err(err) = store.delete_progress(id).await {
        warn!(user_id = %id, error = %err, "failed to delete user progress rows");
    }
    if let Err(err) = store.delete_profile(id).await {
        warn!(user_id = %id, error = %err, "failed to delete profile row");
    }

    identity.delete_user(id).await?;
    Ok(())
}

/// Self-service email change: the identity provider is updated first (with
/// the confirmation round trip bypassed), then the mirror follows
/// best-effort.
pub async fn change_email(
    identity: &dyn IdentityProvider,
    store: &dyn DirectoryStore,
    principal_id: Uuid,
    new_email: &str,
) -> AppResult<()> {
    identity.update_email(principal_id, new_email).await?;

    if let Err(err) = store.update_profile_email(principal_id, new_email).await {
        warn!(user_id = %principal_id, error = %err, "failed to update mirrored profile email");
    }
    Ok(())
}

fn welcome_email(name: &str, to: &str, password: &SecretString, app_base_url: &str) -> Email {
    let login_url = format!("{}/", app_base_url.trim_end_matches('/'));
    let password = password.expose_secret();

    let text = format!(
        "Welcome, {name}!\n\n\
         Your account has been created for DekodeCamp. You can access the \
         platform using the credentials below:\n\n\
         Email: {to}\n\
         Temporary Password: {password}\n\n\
         Login URL: {login_url}\n\n\
         IMPORTANT: Please change your temporary password after logging in.\n\n\
         If you have any questions, contact support at support@dekodecamp.com.\n\n\
         Best regards,\n\
         The DekodeCamp Team"
    );

    let html = format!(
        "<h1>Welcome to DekodeCamp</h1>\
         <p>Hello {name},</p>\
         <p>Your account has been created. Log in with the credentials below:</p>\
         <p><strong>Email:</strong> <code>{to}</code><br>\
         <strong>Temporary Password:</strong> <code>{password}</code></p>\
         <p><a href=\"{login_url}\">Login to Your Account</a></p>\
         <p>Please change your temporary password immediately after logging in.</p>\
         <p>Best regards,<br><strong>The DekodeCamp Team</strong></p>"
    );

    Email {
        to: to.to_string(),
        subject: "Welcome to DekodeCamp - Your Account Has Been Created".to_string(),
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::providers::{IdentityError, MailError, Principal};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeIdentity {
        users: Mutex<Vec<Principal>>,
        deleted: Mutex<Vec<Uuid>>,
        reject_create: bool,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn create_user(
            &self,
            email: &str,
            _password: &SecretString,
            name: &str,
            _role: Role,
        ) -> Result<Principal, IdentityError> {
            if self.reject_create {
                return Err(IdentityError::Rejected("email already registered".to_string()));
            }
            let principal = Principal {
                id: Uuid::new_v4(),
                email: email.to_string(),
                name: Some(name.to_string()),
            };
            self.users.lock().unwrap().push(principal.clone());
            Ok(principal)
        }

        async fn user_from_token(&self, _token: &str) -> Result<Principal, IdentityError> {
            Err(IdentityError::InvalidToken)
        }

        async fn update_email(&self, id: Uuid, new_email: &str) -> Result<(), IdentityError> {
            let mut users = self.users.lock().unwrap();
            match users.iter_mut().find(|u| u.id == id) {
                Some(user) => {
                    user.email = new_email.to_string();
                    Ok(())
                }
                None => Err(IdentityError::Rejected("user not found".to_string())),
            }
        }

        async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
            self.deleted.lock().unwrap().push(id);
            self.users.lock().unwrap().retain(|u| u.id != id);
            Ok(())
        }
    }

    /// Records call order; individual operations can be set to fail.
    #[derive(Default)]
    struct FakeDirectory {
        calls: Mutex<Vec<&'static str>>,
        fail_all: bool,
    }

    impl FakeDirectory {
        fn failing() -> Self {
            Self {
                fail_all: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) -> Result<(), DatabaseError> {
            self.calls.lock().unwrap().push(call);
            if self.fail_all {
                Err(DatabaseError::Sqlx(sqlx::Error::PoolClosed))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DirectoryStore for FakeDirectory {
        async fn upsert_profile(&self, _profile: &NewProfile) -> Result<(), DatabaseError> {
            self.record("upsert_profile")
        }

        async fn update_profile_email(
            &self,
            _id: Uuid,
            _email: &str,
        ) -> Result<(), DatabaseError> {
            self.record("update_profile_email")
        }

        async fn delete_profile(&self, _id: Uuid) -> Result<(), DatabaseError> {
            self.record("delete_profile")
        }

        async fn delete_progress(&self, _user_id: Uuid) -> Result<(), DatabaseError> {
            self.record("delete_progress")
        }
    }

    struct FakeMailer {
        fail: bool,
        sent: Mutex<Vec<Email>>,
    }

    impl FakeMailer {
        fn working() -> Self {
            Self {
                fail: false,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                fail: true,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, email: &Email) -> Result<String, MailError> {
            if self.fail {
                return Err(MailError::Send("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok("msg-1".to_string())
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            api_key: None,
            from: "DekodeCamp <noreply@dekodecamp.com>".to_string(),
            reply_to: "support@dekodecamp.com".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
        }
    }

    fn alice() -> NewAccount {
        NewAccount {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "temporary-password".to_string().into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn provision_succeeds_even_when_email_is_unreachable() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::default();
        let mailer = FakeMailer::unreachable();

        let account = provision(&identity, &directory, &mailer, &email_config(), &alice())
            .await
            .unwrap();

        assert!(!account.email_outcome.sent);
        assert!(account.email_outcome.error.is_some());
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(identity.users.lock().unwrap().len(), 1, "principal must exist");
    }

    #[tokio::test]
    async fn provision_sends_credentials_and_mirrors_the_profile() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::default();
        let mailer = FakeMailer::working();

        let account = provision(&identity, &directory, &mailer, &email_config(), &alice())
            .await
            .unwrap();

        assert!(account.email_outcome.sent);
        assert!(account.email_outcome.error.is_none());
        assert_eq!(directory.calls(), vec!["upsert_profile"]);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].to, "alice@example.com");
        assert!(sent[0].text.contains("temporary-password"));
    }

    #[tokio::test]
    async fn provision_survives_a_failed_profile_mirror() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::failing();
        let mailer = FakeMailer::working();

        let account = provision(&identity, &directory, &mailer, &email_config(), &alice())
            .await
            .unwrap();

        assert!(account.email_outcome.sent);
        assert_eq!(identity.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn provision_fails_when_the_identity_provider_rejects() {
        let identity = FakeIdentity {
            reject_create: true,
            ..Default::default()
        };
        let directory = FakeDirectory::default();
        let mailer = FakeMailer::working();

        let err = provision(&identity, &directory, &mailer, &email_config(), &alice())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(directory.calls().is_empty(), "no secondary effects may run");
    }

    #[tokio::test]
    async fn provision_validates_the_request_first() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::default();
        let mailer = FakeMailer::working();

        let invalid = NewAccount {
            email: "not-an-email".to_string(),
            ..alice()
        };
        let err = provision(&identity, &directory, &mailer, &email_config(), &invalid)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(identity.users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_dependent_rows_before_the_identity() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::default();
        let id = Uuid::new_v4();

        remove(&identity, &directory, id).await.unwrap();

        assert_eq!(directory.calls(), vec!["delete_progress", "delete_profile"]);
        assert_eq!(identity.deleted.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn remove_proceeds_past_dependent_row_failures() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::failing();
        let id = Uuid::new_v4();

        remove(&identity, &directory, id).await.unwrap();

        assert_eq!(identity.deleted.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn change_email_updates_identity_then_mirror() {
        let identity = FakeIdentity::default();
        let directory = FakeDirectory::default();
        let mailer = FakeMailer::working();

        let account = provision(&identity, &directory, &mailer, &email_config(), &alice())
            .await
            .unwrap();

        change_email(&identity, &directory, account.id, "new@example.com")
            .await
            .unwrap();

        assert_eq!(identity.users.lock().unwrap()[0].email, "new@example.com");
        assert!(directory.calls().contains(&"update_profile_email"));
    }
}
