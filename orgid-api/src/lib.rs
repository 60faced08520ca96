//! orgid-api library - institution matching HTTP service
//!
//! Exposes the router and shared state for the binary and for integration tests.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use orgid_common::evaluation::TestSource;
use orgid_common::InstitutionService;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Matching service (index built once, read-only afterwards)
    pub institutions: Arc<InstitutionService>,
    /// Labeled test data for evaluation runs, fetched fresh per run
    pub test_source: Arc<dyn TestSource>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(institutions: Arc<InstitutionService>, test_source: Arc<dyn TestSource>) -> Self {
        Self {
            institutions,
            test_source,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::institution_routes())
        .merge(api::evaluation_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
