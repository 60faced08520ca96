//! Institution lookup endpoints

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use orgid_common::models::QueryResult;
use serde::Deserialize;

use crate::{ApiError, ApiResult, AppState};

/// Query parameters for single lookup
#[derive(Debug, Deserialize)]
pub struct InstitutionQuery {
    /// Free-text string to match against
    pub query: Option<String>,
}

/// Body of a batch lookup
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub queries: Vec<String>,
}

/// GET /entities/institutions?query=...
///
/// Match one free-text string. An empty string is a valid query with no matches.
pub async fn get_institutions(
    State(state): State<AppState>,
    Query(params): Query<InstitutionQuery>,
) -> ApiResult<Json<QueryResult>> {
    let query = params
        .query
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: query".to_string()))?;

    Ok(Json(state.institutions.process_query(&query).await))
}

/// POST /entities/institutions
///
/// Match several strings; results keep request order.
pub async fn post_institutions(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<QueryResult>>> {
    let Json(request) = body?;

    let mut results = Vec::with_capacity(request.queries.len());
    for query in &request.queries {
        results.push(state.institutions.process_query(query).await);
    }
    Ok(Json(results))
}

/// Build institution lookup routes
pub fn institution_routes() -> Router<AppState> {
    Router::new().route(
        "/entities/institutions",
        get(get_institutions).post(post_institutions),
    )
}
