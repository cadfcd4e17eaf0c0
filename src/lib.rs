pub mod archiver;
pub mod auth;
pub mod cli;
pub mod collection_store;
pub mod config;
pub mod db;
pub mod downloads;
pub mod error;
pub mod locator;
pub mod mailer;
pub mod models;
pub mod processor;
pub mod repo;
pub mod response;
pub mod routes;
pub mod sharing;
pub mod storage;
pub mod styles;

use std::sync::Arc;

use axum::{Router, routing::get};
use sqlx::SqlitePool;
use time::Duration;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Level;

use crate::archiver::Archiver;
use crate::collection_store::CollectionStore;
use crate::config::Config;
use crate::downloads::{ArchiveOrchestrator, FileManager};
use crate::locator::FileLocator;
use crate::mailer::{CollectionMailer, MailLedger, MailTransport};
use crate::processor::EntityProcessor;
use crate::repo::{FileRepository, MediaRepository, StyleRepository};
use crate::response::FileResponseBuilder;
use crate::sharing::SharingService;
use crate::storage::{FileStorage, LocalStorage};
use crate::styles::StyleEngine;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub base_url: String,
    pub storage: Arc<dyn FileStorage>,
    pub files: Arc<FileRepository>,
    pub media: Arc<MediaRepository>,
    pub styles: Arc<StyleRepository>,
    pub collections: Arc<CollectionStore>,
    pub orchestrator: Arc<ArchiveOrchestrator>,
    pub sharing: Arc<SharingService>,
    pub mailer: Arc<CollectionMailer>,
    pub responses: Arc<FileResponseBuilder>,
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on `pool`
/// beforehand. This function wires the service graph (storage, locator,
/// processor, archiver, sharing, mailer), sets up the session store (and
/// migrates its table), then assembles all route modules, middleware,
/// and state.
pub async fn build_app(
    pool: SqlitePool,
    config: Config,
    mail: Arc<dyn MailTransport>,
    secure_cookies: bool,
) -> Router {
    let session_store = SqliteStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Failed to migrate session store");

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(30)))
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax);

    let storage: Arc<dyn FileStorage> = Arc::new(LocalStorage::new(&config));
    let files = Arc::new(FileRepository::new(pool.clone()));
    let media = Arc::new(MediaRepository::new(pool.clone()));
    let styles = Arc::new(StyleRepository::new(pool.clone()));

    let style_engine = Arc::new(StyleEngine::new(storage.clone()));
    let locator = Arc::new(FileLocator::new(
        media.clone(),
        files.clone(),
        style_engine,
        storage.clone(),
    ));
    let processor = Arc::new(EntityProcessor::new(
        locator,
        media.clone(),
        styles.clone(),
        storage.clone(),
    ));
    let file_manager = Arc::new(FileManager::new(files.clone(), storage.clone()));
    let orchestrator = Arc::new(ArchiveOrchestrator::new(
        processor,
        Archiver::new(),
        storage.clone(),
        file_manager,
        styles.clone(),
    ));

    let collections = Arc::new(CollectionStore::new(pool.clone()));
    let sharing = Arc::new(SharingService::new(
        pool.clone(),
        collections.clone(),
        orchestrator.clone(),
    ));
    let mailer = Arc::new(CollectionMailer::new(
        MailLedger::new(pool.clone()),
        mail,
        config.base_url.clone(),
        config.smtp_from.clone(),
    ));
    let responses = Arc::new(FileResponseBuilder::new(storage.clone()));

    let state = AppState {
        db: pool,
        base_url: config.base_url,
        storage,
        files,
        media,
        styles,
        collections,
        orchestrator,
        sharing,
        mailer,
        responses,
    };

    Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::media::router())
        .merge(routes::collection::router())
        .merge(routes::share::router())
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
