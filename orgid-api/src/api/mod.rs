//! HTTP API handlers for orgid-api

pub mod buildinfo;
pub mod evaluation;
pub mod health;
pub mod institutions;

pub use buildinfo::get_build_info;
pub use evaluation::{evaluation_routes, run_tests};
pub use health::health_routes;
pub use institutions::{get_institutions, institution_routes, post_institutions};
