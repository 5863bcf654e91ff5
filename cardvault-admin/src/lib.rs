//! cardvault-admin library - card inventory administration
//!
//! Card ingestion from Scryfall payloads, per-location quantity tracking,
//! set catalog import and location management behind an HTTP admin API.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

pub use context::OpContext;
pub use error::{ApiError, ApiResult};

use services::{
    BlobStore, CardIngest, CardRepository, InventoryLedger, LocationRegistry, SetCatalogSync,
    SharedCardSource, PUBLIC_FOLDERS,
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Image and icon storage
    pub store: BlobStore,
    /// External card-data source
    pub source: SharedCardSource,
    /// Server startup timestamp (for uptime calculation)
    pub startup_time: DateTime<Utc>,
    pub cards: CardRepository,
    pub ledger: InventoryLedger,
    pub ingest: CardIngest,
    pub locations: LocationRegistry,
    pub set_sync: SetCatalogSync,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, store: BlobStore, source: SharedCardSource) -> Self {
        let cards = CardRepository::new(db.clone(), store.clone(), source.clone());
        Self {
            ledger: InventoryLedger::new(db.clone()),
            ingest: CardIngest::new(db.clone(), cards.clone()),
            locations: LocationRegistry::new(db.clone()),
            set_sync: SetCatalogSync::new(db.clone(), store.clone(), source.clone()),
            cards,
            db,
            store,
            source,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Stored images and set icons are served read-only under
/// `/storage/{front,back,sets}`; staging folders are never exposed.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(api::health_routes())
        .merge(api::card_routes())
        .merge(api::location_routes())
        .merge(api::set_routes());

    for folder in PUBLIC_FOLDERS {
        router = router.nest_service(
            &format!("/storage/{}", folder),
            ServeDir::new(state.store.root().join(folder)),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
