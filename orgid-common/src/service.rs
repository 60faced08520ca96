//! Query matching service
//!
//! Owns the name index (built lazily, exactly once) and the geo extractor,
//! and turns a free-text query into a [`QueryResult`]. Shared read-only
//! across request handlers after the index is built.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::geo::{GeoExtractionResult, GeoExtractor};
use crate::index::{NameIndex, RegistrySource};
use crate::models::{Match, QueryResult};
use crate::tokenize::tokenize;

/// Institution matching service
pub struct InstitutionService {
    source: RegistrySource,
    index: OnceCell<Arc<NameIndex>>,
    geo: Arc<dyn GeoExtractor>,
}

impl InstitutionService {
    /// Create a service that builds its index from `source` on first use
    pub fn new(source: RegistrySource, geo: Arc<dyn GeoExtractor>) -> Self {
        Self {
            source,
            index: OnceCell::new(),
            geo,
        }
    }

    /// Create a service around an already built index
    pub fn with_index(index: NameIndex, geo: Arc<dyn GeoExtractor>) -> Self {
        Self {
            source: RegistrySource::Rows(Vec::new()),
            index: OnceCell::new_with(Some(Arc::new(index))),
            geo,
        }
    }

    /// Build the index if it has not been built yet.
    ///
    /// Concurrent callers wait for the single build; later calls return the
    /// existing index. Never fails: registry problems yield a placeholder index.
    pub async fn ensure_loaded(&self) -> Arc<NameIndex> {
        self.index
            .get_or_init(|| async {
                let source = self.source.clone();
                let loaded = tokio::task::spawn_blocking(move || source.load().into_index()).await;
                match loaded {
                    Ok(index) => Arc::new(index),
                    Err(e) => {
                        warn!("Registry load task failed: {}; using fallback institution data", e);
                        Arc::new(NameIndex::fallback())
                    }
                }
            })
            .await
            .clone()
    }

    /// Whether the index has been built
    pub fn is_loaded(&self) -> bool {
        self.index.initialized()
    }

    /// The index, if already built
    pub fn index(&self) -> Option<Arc<NameIndex>> {
        self.index.get().cloned()
    }

    /// Place names found in `text`; extraction failures yield an empty list
    pub fn find_geonames(&self, text: &str) -> Vec<String> {
        consume_geo_result(self.geo.extract(text))
    }

    /// Resolve a free-text query into institution matches
    pub async fn process_query(&self, query: &str) -> QueryResult {
        let index = self.ensure_loaded().await;
        match_query(&index, &self.find_geonames(query), query)
    }
}

fn consume_geo_result(result: GeoExtractionResult) -> Vec<String> {
    match result {
        Ok(extraction) => extraction.geonames(),
        Err(e) => {
            warn!("Error extracting geonames: {}", e);
            Vec::new()
        }
    }
}

/// Tokenize `query` and look every token up, in tokenizer order.
///
/// One [`Match`] is produced per institution per token, so an institution
/// reached by several tokens appears several times.
pub fn match_query(index: &NameIndex, geonames: &[String], query: &str) -> QueryResult {
    let tokens = tokenize(query);
    let mut matches = Vec::new();

    for token in tokens {
        let found = index.lookup(&token, geonames);
        for institution in found.institutions {
            matches.push(Match {
                token: token.clone(),
                institution,
                is_token_unique: found.is_unique,
            });
        }
    }

    debug!(query = %query, geonames = geonames.len(), matches = matches.len(), "Query processed");

    QueryResult {
        query: query.to_string(),
        geonames: geonames.to_vec(),
        matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoError, GeoExtraction, NoGeoExtractor};
    use crate::index::RegistryRow;
    use std::collections::BTreeMap;

    struct FailingGeo;

    impl GeoExtractor for FailingGeo {
        fn extract(&self, _text: &str) -> GeoExtractionResult {
            Err(GeoError::Pattern(regex::Regex::new("(").unwrap_err()))
        }
    }

    struct FixedGeo(Vec<String>);

    impl GeoExtractor for FixedGeo {
        fn extract(&self, _text: &str) -> GeoExtractionResult {
            let mut cities = BTreeMap::new();
            cities.insert("United States".to_string(), self.0.clone());
            Ok(GeoExtraction {
                cities,
                countries: BTreeMap::new(),
            })
        }
    }

    fn row(id: &str, external: &str, name: &str, names: Option<&str>) -> RegistryRow {
        RegistryRow {
            id: Some(id.to_string()),
            openalex_id: Some(external.to_string()),
            display_name: Some(name.to_string()),
            acronyms: None,
            names: names.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_ensure_loaded_builds_once() {
        let service = InstitutionService::new(
            RegistrySource::Rows(vec![row("r1", "I1", "Example University", None)]),
            Arc::new(NoGeoExtractor),
        );
        assert!(!service.is_loaded());

        let first = service.ensure_loaded().await;
        let second = service.ensure_loaded().await;
        assert!(service.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_geo_failure_degrades_to_empty() {
        let service = InstitutionService::new(
            RegistrySource::Rows(vec![row("r1", "I1", "Example University", None)]),
            Arc::new(FailingGeo),
        );
        let result = service.process_query("Example University, Boston").await;
        assert!(result.geonames.is_empty());
        assert_eq!(result.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_geonames_disambiguate_in_query() {
        let service = InstitutionService::new(
            RegistrySource::Rows(vec![
                row("r1", "I1", "Saint Mary's College Notre Dame", Some("Saint Mary's College")),
                row("r2", "I2", "Saint Mary's College Moraga", Some("Saint Mary's College")),
            ]),
            Arc::new(FixedGeo(vec!["Moraga".to_string()])),
        );
        let result = service.process_query("Saint Mary's College, Moraga").await;
        assert_eq!(result.geonames, vec!["Moraga"]);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].institution.id, "I2");
        assert!(result.matches[0].is_token_unique);
    }

    #[test]
    fn test_same_institution_from_two_tokens() {
        let index = NameIndex::build(vec![RegistryRow {
            acronyms: Some("MIT".to_string()),
            ..row("r1", "I7", "Massachusetts Institute of Technology", None)
        }]);
        let result = match_query(&index, &[], "MIT, Massachusetts Institute of Technology");
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].token, "MIT");
        assert_eq!(result.matches[1].token, "Massachusetts Institute of Technology");
        assert!(result.matches.iter().all(|m| m.institution.id == "I7"));
    }

    #[test]
    fn test_ambiguous_token_yields_one_match_per_candidate() {
        let index = NameIndex::build(vec![
            row("r1", "I1", "Trinity College Dublin", Some("Trinity College")),
            row("r2", "I2", "Trinity College Hartford", Some("Trinity College")),
        ]);
        let result = match_query(&index, &[], "Trinity College");
        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.iter().all(|m| !m.is_token_unique));
    }
}
