//! Evaluation endpoint
//!
//! Runs a labeled dataset through the matcher and reports precision/recall.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use orgid_common::evaluation::TestService;
use orgid_common::models::{TestCase, TestRunSummary};
use serde::Deserialize;

use crate::AppState;

/// Optional body of a test run
#[derive(Debug, Default, Deserialize)]
pub struct TestRunRequest {
    /// When non-empty, run these instead of the fetched dataset
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// POST /tests/:dataset
///
/// The dataset is fetched on every call. A missing or unparseable body runs
/// the fetched tests; a failed fetch yields an empty run, never an error.
pub async fn run_tests(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    body: Option<Json<TestRunRequest>>,
) -> Json<TestRunSummary> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let service = TestService::new(state.institutions.clone(), state.test_source.clone());
    Json(service.run_dataset(&dataset, request.tests).await)
}

/// Build evaluation routes
pub fn evaluation_routes() -> Router<AppState> {
    Router::new().route("/tests/:dataset", post(run_tests))
}
