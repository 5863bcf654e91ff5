//! Location endpoints

use crate::api::SuccessResponse;
use crate::db::locations::LocationSummary;
use crate::services::locations::{DeletedLocation, LocationDetail, LocationInput, ParentOption};
use crate::{ApiResult, AppState, OpContext};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use cardvault_common::db::Location;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct LocationBody {
    pub location: Location,
}

/// GET /api/locations
///
/// Newest first, with summed card counts and parent deck names.
pub async fn list_locations(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<LocationSummary>>> {
    let data = state.locations.list().await?;
    Ok(Json(ListResponse { data }))
}

/// GET /api/locations/eligible-parents
pub async fn eligible_parents(
    State(state): State<AppState>,
) -> ApiResult<Json<ListResponse<ParentOption>>> {
    let data = state.locations.eligible_parents().await?;
    Ok(Json(ListResponse { data }))
}

/// POST /api/locations
pub async fn create_location(
    State(state): State<AppState>,
    ctx: OpContext,
    Json(input): Json<LocationInput>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<LocationBody>>)> {
    let location = state.locations.create(&ctx, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(
            "Location created successfully.",
            LocationBody { location },
        )),
    ))
}

/// GET /api/locations/:id
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LocationDetail>> {
    Ok(Json(state.locations.detail(id).await?))
}

/// PUT /api/locations/:id
pub async fn update_location(
    State(state): State<AppState>,
    ctx: OpContext,
    Path(id): Path<i64>,
    Json(input): Json<LocationInput>,
) -> ApiResult<Json<SuccessResponse<LocationBody>>> {
    let location = state.locations.update(&ctx, id, &input).await?;
    Ok(Json(SuccessResponse::new(
        "Location updated successfully.",
        LocationBody { location },
    )))
}

/// DELETE /api/locations/:id
///
/// Instance rows at the location are removed with it.
pub async fn delete_location(
    State(state): State<AppState>,
    ctx: OpContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<DeletedLocation>>> {
    let deleted = state.locations.delete(&ctx, id).await?;
    Ok(Json(SuccessResponse::new(
        "Location deleted successfully.",
        deleted,
    )))
}

/// Build location routes
pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/api/locations", get(list_locations).post(create_location))
        .route("/api/locations/eligible-parents", get(eligible_parents))
        .route(
            "/api/locations/:id",
            get(get_location).put(update_location).delete(delete_location),
        )
}
