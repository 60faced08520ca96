//! Request/response data types shared by the matcher, evaluator and HTTP layer
//!
//! Wire names are camelCase; snake_case aliases are accepted on input.

use serde::{Deserialize, Serialize};

/// Academic institution resolved from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    /// External (bibliographic database) id, e.g. `I136199984`
    pub id: String,
    /// Display name
    pub name: String,
    /// Registry URL, e.g. `https://ror.org/03vek6s52`
    pub ror: String,
    /// Acronyms followed by other known names, in registry order
    #[serde(default, alias = "alternate_names")]
    pub alternate_names: Vec<String>,
}

/// One institution matched by one query token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// The fragment the match was made on
    pub token: String,
    pub institution: Institution,
    /// False when the token names several institutions that could not be told apart
    #[serde(alias = "is_token_unique")]
    pub is_token_unique: bool,
}

/// Result of resolving one free-text query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub query: String,
    /// City and country names found in the query
    #[serde(default)]
    pub geonames: Vec<String>,
    /// May list one institution several times when several tokens hit it
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Expected institution in a labeled test case; only `id` is required
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedEntity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ror: String,
    #[serde(default, alias = "alternate_names")]
    pub alternate_names: Vec<String>,
}

impl ExpectedEntity {
    /// Placeholder institution built from the expectation's own fields
    pub fn to_institution(&self) -> Institution {
        Institution {
            id: self.id.clone(),
            name: self.name.clone(),
            ror: self.ror.clone(),
            alternate_names: self.alternate_names.clone(),
        }
    }
}

/// Labeled query with its ground truth
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default, alias = "expected_entities")]
    pub expected_entities: Vec<ExpectedEntity>,
}

/// Classified matches for one test case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMatches {
    /// Matches whose institution was expected
    pub correct: Vec<Match>,
    /// Matches whose institution was not expected
    pub overmatched: Vec<Match>,
    /// Expected institutions that no match produced
    pub undermatched: Vec<Institution>,
}

/// Outcome of running one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub id: String,
    pub query: String,
    pub is_passing: bool,
    #[serde(flatten)]
    pub results: TestMatches,
}

/// Precision/recall block of a run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub percentage_passing: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Wall-clock timings of a run, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub total: f64,
    pub setup: f64,
    pub per_test: f64,
}

/// Aggregate counters of a test run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub total: usize,
    pub passing: usize,
    pub failing: usize,
    pub performance: Performance,
    pub timing: Timing,
}

/// Full response of an evaluation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRunSummary {
    pub meta: RunMeta,
    pub results: Vec<TestOutcome>,
}
