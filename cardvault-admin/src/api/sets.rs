//! Set library endpoints

use crate::db::sets::{self, SetSort};
use crate::pagination::{Page, SETS_PAGE_SIZE};
use crate::services::set_sync::SyncReport;
use crate::{ApiResult, AppState, OpContext};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use cardvault_common::db::MtgSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SetQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SetFilters {
    pub search: Option<String>,
    pub sort: SetSort,
}

#[derive(Debug, Serialize)]
pub struct SetLibraryResponse {
    pub sets: Page<MtgSet>,
    pub filters: SetFilters,
}

/// GET /api/sets?search=&sort=&page=
///
/// `sort` is one of name_asc, name_desc, date_asc, date_desc (default).
pub async fn list_sets(
    State(state): State<AppState>,
    Query(query): Query<SetQuery>,
) -> ApiResult<Json<SetLibraryResponse>> {
    let sort = SetSort::parse(query.sort.as_deref());
    let page = sets::list_sets(
        &state.db,
        query.search.as_deref(),
        sort,
        query.page.unwrap_or(1),
        SETS_PAGE_SIZE,
    )
    .await?;

    Ok(Json(SetLibraryResponse {
        sets: page,
        filters: SetFilters {
            search: query.search,
            sort,
        },
    }))
}

/// POST /api/sets/sync
///
/// **Response:** the sync report; 502 with the same body when the set list
/// could not be fetched.
pub async fn sync_sets(
    State(state): State<AppState>,
    ctx: OpContext,
) -> ApiResult<(StatusCode, Json<SyncReport>)> {
    let report = state.set_sync.sync_sets(&ctx).await?;
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(report)))
}

/// Build set routes
pub fn set_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sets", get(list_sets))
        .route("/api/sets/sync", post(sync_sets))
}
