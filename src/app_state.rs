use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::providers::{IdentityProvider, Mailer, ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: Config,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        env: Config,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn ObjectStorage>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            env,
            identity,
            storage,
            mailer,
        }
    }
}
