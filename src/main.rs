use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod app_state;
mod config;
mod db;
mod error;
mod middleware;
mod modules;
mod providers;
mod workflow;

use app_state::AppState;
use providers::{HttpIdentity, HttpObjectStorage, ResendMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv().ok();

    let config = config::init().context("Failed to load configuration")?;
    let pool = db::init_pool()
        .await
        .context("Failed to initialize database pool")?;

    let state = AppState::new(
        pool,
        config.clone(),
        Arc::new(HttpIdentity::new(&config.identity)),
        Arc::new(HttpObjectStorage::new(&config.storage)),
        Arc::new(ResendMailer::new(&config.email)),
    );

    let app = app::create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", config.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    Ok(())
}
