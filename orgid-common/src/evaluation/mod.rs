//! Batch evaluation against labeled test cases
//!
//! Runs each labeled query through the [`InstitutionService`], classifies
//! the produced matches as correct or overmatched, lists expected
//! institutions that were missed, and aggregates precision and recall.
//!
//! A test passes when every expected id was found and the number of
//! matches equals the number of expected ids. The count comparison is not
//! a set comparison: duplicate matches or duplicate expectations fail a
//! test even if the sets agree.

pub mod source;

pub use source::{parse_test_sheet, HttpTestSource, StaticTestSource, TestFetchResult, TestSource};

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::models::{
    Performance, QueryResult, RunMeta, TestCase, TestMatches, TestOutcome, TestRunSummary, Timing,
};
use crate::service::InstitutionService;

/// Evaluation service; one instance per run is cheap
pub struct TestService {
    institutions: Arc<InstitutionService>,
    source: Arc<dyn TestSource>,
}

impl TestService {
    pub fn new(institutions: Arc<InstitutionService>, source: Arc<dyn TestSource>) -> Self {
        Self {
            institutions,
            source,
        }
    }

    /// Fetch the labeled tests of `dataset`; fetch failures yield no tests
    pub async fn load_tests(&self, dataset: &str) -> Vec<TestCase> {
        consume_fetch_result(self.source.fetch(dataset).await, dataset)
    }

    /// Run every test case through the matcher
    pub async fn run_tests(&self, cases: &[TestCase]) -> Vec<TestOutcome> {
        let mut outcomes = Vec::with_capacity(cases.len());
        for case in cases {
            let result = self.institutions.process_query(&case.query).await;
            outcomes.push(evaluate_case(case, result));
        }
        outcomes
    }

    /// Full run: one fetch of `dataset`, then the override cases if any were
    /// given, otherwise the fetched ones.
    pub async fn run_dataset(&self, dataset: &str, overrides: Vec<TestCase>) -> TestRunSummary {
        let start = Instant::now();

        let fetched = self.load_tests(dataset).await;
        let setup = start.elapsed().as_secs_f64();

        let cases = if overrides.is_empty() { fetched } else { overrides };
        let outcomes = self.run_tests(&cases).await;

        let total_time = start.elapsed().as_secs_f64();
        let summary = summarize(outcomes, setup, total_time);
        info!(
            dataset = %dataset,
            total = summary.meta.total,
            passing = summary.meta.passing,
            precision = summary.meta.performance.precision,
            recall = summary.meta.performance.recall,
            "Test run complete"
        );
        summary
    }
}

fn consume_fetch_result(result: TestFetchResult, dataset: &str) -> Vec<TestCase> {
    match result {
        Ok(cases) => cases,
        Err(e) => {
            warn!("Error loading tests for dataset '{}': {}", dataset, e);
            Vec::new()
        }
    }
}

/// Classify one query result against its test case
pub fn evaluate_case(case: &TestCase, result: QueryResult) -> TestOutcome {
    let expected_ids: Vec<&str> = case
        .expected_entities
        .iter()
        .map(|e| e.id.as_str())
        .filter(|id| !id.is_empty())
        .collect();
    let found_ids: Vec<&str> = result
        .matches
        .iter()
        .map(|m| m.institution.id.as_str())
        .collect();

    let is_passing = expected_ids.iter().all(|id| found_ids.contains(id))
        && found_ids.len() == expected_ids.len();

    let undermatched = case
        .expected_entities
        .iter()
        .filter(|e| !e.id.is_empty() && !found_ids.contains(&e.id.as_str()))
        .map(|e| e.to_institution())
        .collect();

    let (correct, overmatched) = result
        .matches
        .into_iter()
        .partition(|m| expected_ids.contains(&m.institution.id.as_str()));

    TestOutcome {
        id: case.id.clone(),
        query: case.query.clone(),
        is_passing,
        results: TestMatches {
            correct,
            overmatched,
            undermatched,
        },
    }
}

/// Micro-averaged precision and recall over all outcomes.
///
/// Each ratio is 0 when its denominator is 0.
pub fn calculate_metrics(outcomes: &[TestOutcome]) -> (f64, f64) {
    let (tp, fp, fn_) = outcomes.iter().fold((0usize, 0usize, 0usize), |acc, o| {
        (
            acc.0 + o.results.correct.len(),
            acc.1 + o.results.overmatched.len(),
            acc.2 + o.results.undermatched.len(),
        )
    });

    (ratio(tp, tp + fp), ratio(tp, tp + fn_))
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Assemble the run summary from outcomes and timings (seconds)
pub fn summarize(outcomes: Vec<TestOutcome>, setup: f64, total_time: f64) -> TestRunSummary {
    let total = outcomes.len();
    let passing = outcomes.iter().filter(|o| o.is_passing).count();
    let (precision, recall) = calculate_metrics(&outcomes);

    let (percentage_passing, per_test) = if total > 0 {
        (
            passing as f64 / total as f64 * 100.0,
            (total_time - setup) / total as f64,
        )
    } else {
        (0.0, 0.0)
    };

    TestRunSummary {
        meta: RunMeta {
            total,
            passing,
            failing: total - passing,
            performance: Performance {
                percentage_passing,
                precision,
                recall,
            },
            timing: Timing {
                total: total_time,
                setup,
                per_test,
            },
        },
        results: outcomes,
    }
}
