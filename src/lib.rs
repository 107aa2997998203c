use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::{DbConnection, ModelManager};
use crate::services::certificate::CertificateIssuer;
use crate::services::mail::{Mailer, SmtpMailer};
use crate::utils::signal::shutdown_signal;
use crate::{error::AppResult, web::AppState};
use axum::Router;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod services;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "agrilearn";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = config::Config::get_or_init(use_local).await;

    let db = DbConnection::connect(config.app().database_uri())?;

    let migrator = Migrator::new(Path::new("./migrations"))
        .await
        .map_err(model::DatabaseError::from)?;
    tracing::debug!("applying migrations...");
    migrator
        .run(db.pool())
        .await
        .map_err(model::DatabaseError::from)?;

    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::from_config(config.smtp())?);
    let state = build_state(db, mailer, config);
    let app = web::routes::build_app(state.clone(), config);
    Ok((state, app))
}

/// Test entry: skips migrations and SMTP, the caller provides both the
/// database and the mailer.
pub async fn build_server_with_pool(
    db: DbConnection,
    mailer: Arc<dyn Mailer>,
) -> AppResult<(AppState, Router)> {
    let config = config::Config::get_or_init(true).await;

    let state = build_state(db, mailer, config);
    let app = web::routes::build_app(state.clone(), config);
    Ok((state, app))
}

fn build_state(db: DbConnection, mailer: Arc<dyn Mailer>, config: &Config) -> AppState {
    let template = config.certificate().template().map(PathBuf::from);
    let certificates = Arc::new(CertificateIssuer::new(template));

    AppState::new(ModelManager::new(db), mailer, certificates)
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (_, app) = build_server().await?;
    let config = Config::get_or_init(false).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;

    tracing::info!("axum is starting at: {}", config.host().bindto());
    let axum_handle = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    axum_handle.await?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
