//! Scryfall API client
//!
//! The core only talks to the external card-data source through the
//! [`CardSource`] trait, so tests can substitute an in-memory stub.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("CardVault/", env!("CARGO_PKG_VERSION"));
/// Scryfall asks clients to keep 50-100 ms between requests
const REQUEST_SPACING_MS: u64 = 100;

/// Card-data source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<SourceError> for cardvault_common::Error {
    fn from(err: SourceError) -> Self {
        cardvault_common::Error::Upstream(err.to_string())
    }
}

/// External card-data source
///
/// Card and set payloads are returned as raw JSON; the normalizer and the set
/// sync apply their own partial schemas.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// `GET /cards/{id}`
    async fn fetch_card(&self, scryfall_id: &str) -> Result<serde_json::Value, SourceError>;

    /// `GET /sets`, returning the `data` array
    async fn fetch_sets(&self) -> Result<Vec<serde_json::Value>, SourceError>;

    /// Download a binary asset (card image, set icon)
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Shared handle stored in application state
pub type SharedCardSource = Arc<dyn CardSource>;

#[derive(Debug, Deserialize)]
struct SetListResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Keeps consecutive Scryfall requests at least `spacing` apart
///
/// Callers reserve the next free slot under the lock and sleep outside it.
struct RequestSpacer {
    next_slot: Mutex<Option<Instant>>,
    spacing: Duration,
}

impl RequestSpacer {
    fn new(spacing: Duration) -> Self {
        Self {
            next_slot: Mutex::new(None),
            spacing,
        }
    }

    async fn acquire(&self) {
        let now = Instant::now();
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.spacing);
            slot
        };

        if slot > now {
            tracing::debug!(delay_ms = (slot - now).as_millis() as u64, "Spacing Scryfall request");
            tokio::time::sleep_until(slot.into()).await;
        }
    }
}

/// Scryfall API client
pub struct ScryfallClient {
    http_client: reqwest::Client,
    base_url: String,
    spacer: Arc<RequestSpacer>,
}

impl ScryfallClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spacer: Arc::new(RequestSpacer::new(Duration::from_millis(REQUEST_SPACING_MS))),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, SourceError> {
        self.spacer.acquire().await;

        tracing::debug!(url = %url, "Querying Scryfall");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| SourceError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl CardSource for ScryfallClient {
    async fn fetch_card(&self, scryfall_id: &str) -> Result<serde_json::Value, SourceError> {
        let url = format!("{}/cards/{}", self.base_url, scryfall_id);
        let card: serde_json::Value = self
            .get(&url, "application/json")
            .await?
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        tracing::info!(scryfall_id = %scryfall_id, "Retrieved card from Scryfall");

        Ok(card)
    }

    async fn fetch_sets(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        let url = format!("{}/sets", self.base_url);
        let list: SetListResponse = self
            .get(&url, "application/json")
            .await?
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        tracing::info!(count = list.data.len(), "Retrieved set list from Scryfall");

        Ok(list.data)
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let bytes = self
            .get(url, "*/*")
            .await?
            .bytes()
            .await
            .map_err(|e| SourceError::NetworkError(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
