//! Shared test fixtures: temp database, temp blob root, stub card source

#![allow(dead_code)]

use async_trait::async_trait;
use cardvault_admin::services::{BlobStore, CardSource, LocationInput, SourceError};
use cardvault_admin::{AppState, OpContext};
use cardvault_common::db::{init_database, Location};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// In-memory card-data source
#[derive(Default)]
pub struct StubSource {
    cards: Mutex<HashMap<String, Value>>,
    sets: Mutex<Option<Vec<Value>>>,
    assets: Mutex<HashMap<String, Vec<u8>>>,
    asset_requests: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn put_card(&self, card: Value) {
        let id = card["id"].as_str().unwrap().to_string();
        self.cards.lock().unwrap().insert(id, card);
    }

    pub fn remove_card(&self, id: &str) {
        self.cards.lock().unwrap().remove(id);
    }

    /// None makes the set list fetch fail
    pub fn set_sets(&self, sets: Option<Vec<Value>>) {
        *self.sets.lock().unwrap() = sets;
    }

    pub fn put_asset(&self, url: &str, bytes: &[u8]) {
        self.assets.lock().unwrap().insert(url.to_string(), bytes.to_vec());
    }

    pub fn asset_requests(&self) -> Vec<String> {
        self.asset_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CardSource for StubSource {
    async fn fetch_card(&self, scryfall_id: &str) -> Result<Value, SourceError> {
        self.cards
            .lock()
            .unwrap()
            .get(scryfall_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(scryfall_id.to_string()))
    }

    async fn fetch_sets(&self) -> Result<Vec<Value>, SourceError> {
        self.sets
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::ApiError(503, "unavailable".to_string()))
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        self.asset_requests.lock().unwrap().push(url.to_string());
        self.assets
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::ApiError(404, url.to_string()))
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub store: BlobStore,
    pub source: Arc<StubSource>,
    pub state: AppState,
    pub ctx: OpContext,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("cardvault.db")).await.unwrap();
        let store = BlobStore::new(dir.path().join("storage"));
        let source = Arc::new(StubSource::default());
        let state = AppState::new(pool.clone(), store.clone(), source.clone());

        Self {
            dir,
            pool,
            store,
            source,
            state,
            ctx: OpContext::new("tester"),
        }
    }

    pub async fn location(&self, name: &str) -> Location {
        self.location_with(LocationInput {
            name: name.to_string(),
            location_type: "Storage".to_string(),
            ..Default::default()
        })
        .await
    }

    pub async fn location_with(&self, input: LocationInput) -> Location {
        self.state.locations.create(&self.ctx, &input).await.unwrap()
    }

    /// Ingest a bare single-face card and return its row id
    pub async fn card_at(&self, scryfall_id: &str, location_id: i64, qty: i64) -> i64 {
        let outcome = self
            .state
            .ingest
            .add_card(&self.ctx, &simple_card(scryfall_id, "Test Card"), Some(location_id), qty)
            .await
            .unwrap();
        outcome.card_id
    }

    pub async fn quantity(&self, scryfall_id: &str, location_id: i64) -> Option<i64> {
        self.state.ledger.quantity(scryfall_id, location_id).await.unwrap()
    }
}

pub fn simple_card(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "layout": "normal",
        "lang": "en",
        "type_line": "Instant",
        "mana_cost": "{R}",
        "oracle_text": "Deal 3 damage to any target."
    })
}

pub fn fire_ice() -> Value {
    json!({
        "id": "fire-ice-1",
        "name": "Fire // Ice",
        "layout": "split",
        "lang": "en",
        "card_faces": [
            {
                "name": "Fire",
                "mana_cost": "{1}{R}",
                "type_line": "Instant",
                "oracle_text": "Fire deals 2 damage divided as you choose.",
                "image_uris": {"normal": "https://img.test/fire.jpg"}
            },
            {
                "name": "Ice",
                "mana_cost": "{1}{U}",
                "type_line": "Instant",
                "oracle_text": "Tap target permanent. Draw a card.",
                "image_uris": {"normal": "https://img.test/ice.png"}
            }
        ]
    })
}
