//! Card endpoints
//!
//! Listing, detail, ingestion, quantity moves/removals, refresh and delete.

use crate::api::SuccessResponse;
use crate::db::cards::{self, CardSummary, LocationQuantity};
use crate::pagination::{Page, CARDS_PAGE_SIZE};
use crate::services::card_repository::DeletedCard;
use crate::services::ingest::IngestOutcome;
use crate::services::ledger::MoveOutcome;
use crate::{ApiError, ApiResult, AppState, OpContext};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use cardvault_common::db::Card;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// POST /api/cards body
#[derive(Debug, Deserialize)]
pub struct AddCardRequest {
    #[serde(default)]
    pub scryfall_data: serde_json::Value,
    #[serde(default)]
    pub location_id: Option<i64>,
}

/// POST /api/cards/:id/move body
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub quantity: i64,
    pub from_location_id: i64,
    pub to_location_id: i64,
}

/// POST /api/cards/:id/remove body
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub quantity: i64,
    pub location_id: i64,
}

/// GET /api/cards/:id response
#[derive(Debug, Serialize)]
pub struct CardDetail {
    pub id: i64,
    pub scryfall_id: String,
    pub name: String,
    pub layout: String,
    pub lang: String,
    pub type_line: Option<String>,
    pub mana_cost: Option<String>,
    pub oracle_text: Option<String>,
    pub cfl_name: Option<String>,
    pub cfl_mana_cost: Option<String>,
    pub cfl_type_line: Option<String>,
    pub cfl_oracle_text: Option<String>,
    pub cfr_name: Option<String>,
    pub cfr_mana_cost: Option<String>,
    pub cfr_type_line: Option<String>,
    pub cfr_oracle_text: Option<String>,
    pub image_uri: Option<String>,
    pub cfl_image_uri: Option<String>,
    pub cfr_image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stored payload, pretty-printed
    pub scryfall_json: String,
    /// Stored payload, single line
    pub scryfall_json_raw: String,
    pub instances: Vec<LocationQuantity>,
}

impl CardDetail {
    fn new(card: Card, instances: Vec<LocationQuantity>) -> ApiResult<Self> {
        let payload = &card.scryfall_json.0;
        let scryfall_json = serde_json::to_string_pretty(payload)
            .map_err(|e| ApiError::Internal(format!("payload encoding: {}", e)))?;
        let scryfall_json_raw = serde_json::to_string(payload)
            .map_err(|e| ApiError::Internal(format!("payload encoding: {}", e)))?;

        Ok(Self {
            id: card.id,
            scryfall_id: card.scryfall_id,
            name: card.name,
            layout: card.layout,
            lang: card.lang,
            type_line: card.type_line,
            mana_cost: card.mana_cost,
            oracle_text: card.oracle_text,
            cfl_name: card.cfl_name,
            cfl_mana_cost: card.cfl_mana_cost,
            cfl_type_line: card.cfl_type_line,
            cfl_oracle_text: card.cfl_oracle_text,
            cfr_name: card.cfr_name,
            cfr_mana_cost: card.cfr_mana_cost,
            cfr_type_line: card.cfr_type_line,
            cfr_oracle_text: card.cfr_oracle_text,
            image_uri: card.image_uri,
            cfl_image_uri: card.cfl_image_uri,
            cfr_image_uri: card.cfr_image_uri,
            created_at: card.created_at,
            updated_at: card.updated_at,
            scryfall_json,
            scryfall_json_raw,
            instances,
        })
    }
}

/// GET /api/cards?page=
///
/// Cards with at least one copy anywhere, newest first.
pub async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<CardSummary>>> {
    let page = cards::list_in_stock(&state.db, query.page.unwrap_or(1), CARDS_PAGE_SIZE).await?;
    Ok(Json(page))
}

/// POST /api/cards
///
/// **Request:** `{"scryfall_data": {...}, "location_id": 3}`; without
/// `location_id` the default location is used.
pub async fn add_card(
    State(state): State<AppState>,
    ctx: OpContext,
    Json(request): Json<AddCardRequest>,
) -> ApiResult<Json<SuccessResponse<IngestOutcome>>> {
    let outcome = state
        .ingest
        .add_card(&ctx, &request.scryfall_data, request.location_id, 1)
        .await?;
    Ok(Json(SuccessResponse::new(outcome.message.clone(), outcome)))
}

/// GET /api/cards/:id
pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CardDetail>> {
    let card = state.cards.find(id).await?;
    let instances = cards::quantities_for_card(&state.db, &card.scryfall_id).await?;
    Ok(Json(CardDetail::new(card, instances)?))
}

/// DELETE /api/cards/:id
pub async fn delete_card(
    State(state): State<AppState>,
    ctx: OpContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<DeletedCard>>> {
    let deleted = state.cards.delete(&ctx, id).await?;
    Ok(Json(SuccessResponse::new(
        "Card and all instances deleted successfully",
        deleted,
    )))
}

/// POST /api/cards/:id/move
///
/// **Errors:** 422 when the source location holds fewer copies than requested.
pub async fn move_instances(
    State(state): State<AppState>,
    ctx: OpContext,
    Path(id): Path<i64>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<Json<SuccessResponse<MoveOutcome>>> {
    let outcome = state
        .ledger
        .move_cards(
            &ctx,
            id,
            request.from_location_id,
            request.to_location_id,
            request.quantity,
        )
        .await?;
    Ok(Json(SuccessResponse::new(
        "Card instances moved successfully",
        outcome,
    )))
}

/// POST /api/cards/:id/remove
pub async fn remove_instances(
    State(state): State<AppState>,
    ctx: OpContext,
    Path(id): Path<i64>,
    Json(request): Json<RemoveRequest>,
) -> ApiResult<Json<SuccessResponse<serde_json::Value>>> {
    let remaining = state
        .ledger
        .remove(&ctx, id, request.location_id, request.quantity)
        .await?;
    Ok(Json(SuccessResponse::new(
        "Card instances removed successfully",
        json!({ "quantity": remaining }),
    )))
}

/// POST /api/cards/:id/refresh
///
/// **Errors:** 502 when Scryfall cannot be reached; nothing is changed.
pub async fn refresh_card(
    State(state): State<AppState>,
    ctx: OpContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<serde_json::Value>>> {
    let card = state.cards.refresh(&ctx, id).await?;
    Ok(Json(SuccessResponse::new(
        "Card data updated successfully from Scryfall",
        json!({ "card": card }),
    )))
}

/// Build card routes
pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cards", get(list_cards).post(add_card))
        .route("/api/cards/:id", get(get_card).delete(delete_card))
        .route("/api/cards/:id/move", post(move_instances))
        .route("/api/cards/:id/remove", post(remove_instances))
        .route("/api/cards/:id/refresh", post(refresh_card))
}
