//! # orgID Common Library
//!
//! Resolves free-text mentions of academic institutions into registry
//! identifiers. Shared by the orgID HTTP service and batch tooling:
//! - Name normalization and query tokenization
//! - Institution name index built from flattened registry rows
//! - Query matching with geographic disambiguation
//! - Evaluation against labeled test sets (precision/recall)
//! - Configuration loading

pub mod config;
pub mod error;
pub mod evaluation;
pub mod geo;
pub mod index;
pub mod models;
pub mod normalize;
pub mod service;
pub mod tokenize;

pub use error::{Error, Result};
pub use index::{NameIndex, RegistryRow, RegistrySource};
pub use service::InstitutionService;
