//! Evaluation run tests
//!
//! Runs labeled datasets through an in-memory index and checks the
//! pass/fail classification and run summary.

use std::sync::Arc;

use orgid_common::evaluation::{
    parse_test_sheet, HttpTestSource, StaticTestSource, TestService, TestSource,
};
use orgid_common::geo::NoGeoExtractor;
use orgid_common::models::{ExpectedEntity, TestCase};
use orgid_common::{Error, InstitutionService, NameIndex, RegistryRow};

/// Sheet URL on a local port nothing listens on
fn unreachable_sheet_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/tests.csv", addr)
}

fn unreachable_source() -> HttpTestSource {
    HttpTestSource::new(unreachable_sheet_url(), None).unwrap()
}

fn institutions() -> Arc<InstitutionService> {
    let rows = vec![
        RegistryRow {
            id: Some("abc123".to_string()),
            openalex_id: Some("I1".to_string()),
            display_name: Some("Example University".to_string()),
            acronyms: Some("EU".to_string()),
            names: None,
        },
        RegistryRow {
            id: Some("042nb2s44".to_string()),
            openalex_id: Some("I63966007".to_string()),
            display_name: Some("Massachusetts Institute of Technology".to_string()),
            acronyms: Some("MIT".to_string()),
            names: None,
        },
    ];
    Arc::new(InstitutionService::with_index(
        NameIndex::build(rows),
        Arc::new(NoGeoExtractor),
    ))
}

fn case(id: &str, query: &str, expected: &[&str]) -> TestCase {
    TestCase {
        id: id.to_string(),
        query: query.to_string(),
        expected_entities: expected
            .iter()
            .map(|e| ExpectedEntity {
                id: e.to_string(),
                ..Default::default()
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_all_passing_run() {
    let source = StaticTestSource::new(vec![
        case("t1", "Example University, Springfield", &["I1"]),
        case("t2", "Department of Physics, MIT", &["I63966007"]),
    ]);
    let service = TestService::new(institutions(), Arc::new(source));

    let summary = service.run_dataset("affiliations", Vec::new()).await;

    assert_eq!(summary.meta.total, 2);
    assert_eq!(summary.meta.passing, 2);
    assert_eq!(summary.meta.failing, 0);
    assert_eq!(summary.meta.performance.precision, 1.0);
    assert_eq!(summary.meta.performance.recall, 1.0);
    assert_eq!(summary.meta.performance.percentage_passing, 100.0);
    assert!(summary.meta.timing.total >= summary.meta.timing.setup);
}

#[tokio::test]
async fn test_mixed_run_metrics() {
    let source = StaticTestSource::new(vec![
        // correct + overmatched
        case("t1", "Example University; MIT", &["I1"]),
        // undermatched
        case("t2", "Unknown Institute", &["I1"]),
    ]);
    let service = TestService::new(institutions(), Arc::new(source));

    let summary = service.run_dataset("affiliations", Vec::new()).await;

    assert_eq!(summary.meta.passing, 0);
    assert_eq!(summary.meta.failing, 2);
    // tp = 1, fp = 1, fn = 1
    assert_eq!(summary.meta.performance.precision, 0.5);
    assert_eq!(summary.meta.performance.recall, 0.5);
    assert_eq!(summary.results[0].results.overmatched[0].institution.id, "I63966007");
    assert_eq!(summary.results[1].results.undermatched[0].id, "I1");
}

#[tokio::test]
async fn test_overrides_replace_fetched_cases() {
    let source = StaticTestSource::new(vec![case("fetched", "MIT", &["I63966007"])]);
    let service = TestService::new(institutions(), Arc::new(source));

    let summary = service
        .run_dataset("affiliations", vec![case("inline", "Example University", &["I1"])])
        .await;

    assert_eq!(summary.meta.total, 1);
    assert_eq!(summary.results[0].id, "inline");
    assert!(summary.results[0].is_passing);
}

#[tokio::test]
async fn test_failed_fetch_yields_empty_run() {
    let source = unreachable_source();
    assert!(matches!(source.fetch("affiliations").await, Err(Error::Http(_))));

    let service = TestService::new(institutions(), Arc::new(source));

    assert!(service.load_tests("affiliations").await.is_empty());

    let summary = service.run_dataset("affiliations", Vec::new()).await;
    assert_eq!(summary.meta.total, 0);
    assert_eq!(summary.meta.performance.precision, 0.0);
    assert_eq!(summary.meta.performance.recall, 0.0);
    assert_eq!(summary.meta.timing.per_test, 0.0);
    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn test_sheet_to_summary() {
    let sheet = "id,dataset,query,expected_ids\n\
        a,affiliations,\"MIT, Cambridge\",I63966007\n\
        b,affiliations,Example University,I1|I63966007\n\
        c,other,Example University,I1\n";
    let cases = parse_test_sheet(sheet, "affiliations").unwrap();
    let service = TestService::new(institutions(), Arc::new(StaticTestSource::default()));

    let outcomes = service.run_tests(&cases).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_passing);
    assert!(!outcomes[1].is_passing);
    assert_eq!(outcomes[1].results.undermatched[0].id, "I63966007");
}

#[test]
fn test_outcome_serializes_flat() {
    let outcome = orgid_common::evaluation::evaluate_case(
        &case("t1", "q", &["I1"]),
        orgid_common::models::QueryResult {
            query: "q".to_string(),
            geonames: Vec::new(),
            matches: Vec::new(),
        },
    );
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["isPassing"], false);
    assert_eq!(value["undermatched"][0]["id"], "I1");
    assert!(value["correct"].as_array().unwrap().is_empty());
    assert!(value.get("results").is_none());
}
