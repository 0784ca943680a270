use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// External identity provider (GoTrue-style auth API).
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub base_url: String,
    pub service_key: SecretString,
}

/// Bucketed object storage API holding uploaded proof files.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    pub service_key: SecretString,
}

/// Transactional email provider. The API key is optional: without it the
/// mailer reports "not configured" per request instead of failing startup.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_key: Option<SecretString>,
    pub from: String,
    pub reply_to: String,
    pub app_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    /// Bootstrap escape hatch: this email resolves as admin even without a
    /// stored profile role. Unset in a fully role-table-driven setup.
    pub admin_fallback_email: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Server configuration
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        // Database configuration
        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(10),
        };
        let db_min_connections = match env::var("DATABASE_MIN_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            Err(_) => Some(1),
        };

        // Identity provider configuration
        let identity = IdentityConfig {
            base_url: env::var("AUTH_API_URL").context("AUTH_API_URL must be set")?,
            service_key: env::var("AUTH_SERVICE_KEY")
                .context("AUTH_SERVICE_KEY must be set")?
                .into(),
        };

        // Object storage configuration. The service key falls back to the
        // identity key since hosted backends commonly share one.
        let storage = StorageConfig {
            base_url: env::var("STORAGE_API_URL").context("STORAGE_API_URL must be set")?,
            bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "proofs".to_string()),
            service_key: match env::var("STORAGE_SERVICE_KEY") {
                Ok(key) => key.into(),
                Err(_) => identity.service_key.clone(),
            },
        };

        // Email provider configuration (optional)
        let email = EmailConfig {
            api_key: env::var("RESEND_API_KEY").ok().map(Into::into),
            from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "DekodeCamp <noreply@dekodecamp.com>".to_string()),
            reply_to: env::var("EMAIL_REPLY_TO")
                .unwrap_or_else(|_| "support@dekodecamp.com".to_string()),
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        };

        // App configuration
        let environment_str =
            env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let environment = match environment_str.to_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "DekodeCamp Backend".to_string());
        let admin_fallback_email = env::var("ADMIN_FALLBACK_EMAIL").ok();

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            identity,
            storage,
            email,
            app: AppConfig {
                name: app_name,
                environment,
                admin_fallback_email,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    #[allow(unused)]
    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

// Use once_cell for a global config instance that's initialized once
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

pub fn get() -> &'static Config {
    CONFIG.get().expect("Config is not initialized")
}
