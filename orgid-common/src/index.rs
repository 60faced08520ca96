//! Institution name index
//!
//! Maps every normalized display name and alternate name to the registry
//! ids of the institutions carrying it. Built once from registry rows and
//! read-only afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::models::Institution;
use crate::normalize::normalize;
use crate::tokenize::MIN_TOKEN_LEN;
use crate::Result;

/// Prefix turning a bare registry id into its canonical URL
pub const REGISTRY_URL_PREFIX: &str = "https://ror.org/";

/// One flattened registry record as produced by the ingestion pipeline.
///
/// Extra registry columns (location, country, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryRow {
    /// Registry id without URL prefix
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "openalexId")]
    pub openalex_id: Option<String>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
    /// Pipe-delimited acronyms
    #[serde(default)]
    pub acronyms: Option<String>,
    /// Pipe-delimited other names
    #[serde(default)]
    pub names: Option<String>,
}

impl RegistryRow {
    /// Registry id, external id and display name, if all are present and non-blank
    fn required_fields(&self) -> Option<(&str, &str, &str)> {
        let id = non_blank(self.id.as_deref())?;
        let external = non_blank(self.openalex_id.as_deref())?;
        let name = non_blank(self.display_name.as_deref())?;
        Some((id, external, name))
    }

    /// Acronyms then names, split on `|`
    fn alternate_names(&self) -> Vec<String> {
        [self.acronyms.as_deref(), self.names.as_deref()]
            .into_iter()
            .flatten()
            .flat_map(|list| list.split('|'))
            .map(str::to_string)
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Result of resolving a token against the index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lookup {
    pub institutions: Vec<Institution>,
    /// True when the token resolved to exactly one institution
    pub is_unique: bool,
}

/// Normalized name → registry ids, plus the institution records
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    names: HashMap<String, Vec<String>>,
    institutions: HashMap<String, Institution>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from registry rows, skipping incomplete rows
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RegistryRow>,
    {
        let (index, skipped) = Self::build_counted(rows);
        if skipped > 0 {
            warn!("Skipped {} registry rows missing id, external id or name", skipped);
        }
        index
    }

    fn build_counted<I>(rows: I) -> (Self, usize)
    where
        I: IntoIterator<Item = RegistryRow>,
    {
        let mut index = Self::new();
        let skipped = rows.into_iter().filter(|row| !index.insert_row(row)).count();
        (index, skipped)
    }

    /// Add one registry row. Returns false (and leaves the index untouched)
    /// when the registry id, external id or display name is missing.
    pub fn insert_row(&mut self, row: &RegistryRow) -> bool {
        let Some((registry_id, external_id, display_name)) = row.required_fields() else {
            return false;
        };

        let institution = Institution {
            id: external_id.to_string(),
            name: display_name.to_string(),
            ror: format!("{}{}", REGISTRY_URL_PREFIX, registry_id),
            alternate_names: row.alternate_names(),
        };
        self.insert(registry_id, institution);
        true
    }

    /// Add an institution under its display name and every alternate name
    pub fn insert(&mut self, registry_id: &str, institution: Institution) {
        self.add_name(&institution.name, registry_id);
        for alternate in &institution.alternate_names {
            self.add_name(alternate, registry_id);
        }
        self.institutions.insert(registry_id.to_string(), institution);
    }

    fn add_name(&mut self, name: &str, registry_id: &str) {
        if name.chars().count() < MIN_TOKEN_LEN {
            return;
        }
        let ids = self.names.entry(normalize(name)).or_default();
        if !ids.iter().any(|id| id == registry_id) {
            ids.push(registry_id.to_string());
        }
    }

    /// Resolve a token, using geonames to break ties between same-named institutions.
    ///
    /// Ambiguous names are narrowed to institutions whose display name contains
    /// (case-insensitively) one of the geonames; if exactly one survives it is
    /// returned as unique. Otherwise every candidate is returned in ingestion order.
    pub fn lookup(&self, token: &str, geonames: &[String]) -> Lookup {
        let key = normalize(token);
        if key.chars().count() < MIN_TOKEN_LEN {
            return Lookup::default();
        }

        let Some(ids) = self.names.get(&key) else {
            return Lookup::default();
        };

        if let [only] = ids.as_slice() {
            return Lookup {
                institutions: self.institutions.get(only).cloned().into_iter().collect(),
                is_unique: true,
            };
        }

        let candidates: Vec<&Institution> = ids
            .iter()
            .filter_map(|id| self.institutions.get(id))
            .collect();

        if !geonames.is_empty() {
            let lowered: Vec<String> = geonames.iter().map(|g| g.to_lowercase()).collect();
            let located: Vec<&Institution> = candidates
                .iter()
                .copied()
                .filter(|inst| {
                    let name = inst.name.to_lowercase();
                    lowered.iter().any(|g| name.contains(g.as_str()))
                })
                .collect();
            if let [only] = located.as_slice() {
                return Lookup {
                    institutions: vec![(*only).clone()],
                    is_unique: true,
                };
            }
        }

        Lookup {
            institutions: candidates.into_iter().cloned().collect(),
            is_unique: false,
        }
    }

    /// Registry ids indexed under a normalized name
    pub fn ids_for(&self, normalized_name: &str) -> &[String] {
        self.names
            .get(normalized_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Institution record by registry id
    pub fn institution(&self, registry_id: &str) -> Option<&Institution> {
        self.institutions.get(registry_id)
    }

    /// Number of institutions
    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }

    /// Number of distinct normalized names
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Single-institution index used when the registry file does not exist
    pub fn sample() -> Self {
        Self::placeholder(
            "sample123",
            "https://openalex.org/I123456789",
            "Sample University",
            &["SU", "Sample Univ"],
        )
    }

    /// Single-institution index used when the registry file cannot be read
    pub fn fallback() -> Self {
        Self::placeholder(
            "fallback123",
            "https://openalex.org/I987654321",
            "Fallback University",
            &["FU", "Fallback Univ"],
        )
    }

    fn placeholder(registry_id: &str, external_id: &str, name: &str, alternates: &[&str]) -> Self {
        let mut index = Self::new();
        index.insert(
            registry_id,
            Institution {
                id: external_id.to_string(),
                name: name.to_string(),
                ror: format!("{}{}", REGISTRY_URL_PREFIX, registry_id),
                alternate_names: alternates.iter().map(|a| a.to_string()).collect(),
            },
        );
        index
    }
}

/// Where registry rows come from
#[derive(Debug, Clone)]
pub enum RegistrySource {
    /// Flattened registry CSV on disk
    Csv(PathBuf),
    /// Rows supplied in memory
    Rows(Vec<RegistryRow>),
}

/// How an index load went; every variant still yields a usable index
#[derive(Debug)]
pub enum IndexLoadResult {
    Loaded {
        index: NameIndex,
        skipped_rows: usize,
    },
    /// Registry file absent; placeholder index substituted
    Missing { index: NameIndex, path: PathBuf },
    /// Registry unreadable; placeholder index substituted
    Failed { index: NameIndex, reason: String },
}

impl IndexLoadResult {
    /// Log the outcome and hand back the index
    pub fn into_index(self) -> NameIndex {
        match self {
            IndexLoadResult::Loaded {
                index,
                skipped_rows,
            } => {
                info!(
                    "Loaded {} institutions with {} normalized names ({} rows skipped)",
                    index.len(),
                    index.name_count(),
                    skipped_rows
                );
                index
            }
            IndexLoadResult::Missing { index, path } => {
                warn!(
                    "Registry file not found at {}; using sample institution data",
                    path.display()
                );
                index
            }
            IndexLoadResult::Failed { index, reason } => {
                warn!("Error loading registry ({}); using fallback institution data", reason);
                index
            }
        }
    }
}

impl RegistrySource {
    /// Build an index from this source. Never fails: a missing or unreadable
    /// registry yields a placeholder index.
    pub fn load(&self) -> IndexLoadResult {
        match self {
            RegistrySource::Rows(rows) => {
                let (index, skipped_rows) = NameIndex::build_counted(rows.iter().cloned());
                IndexLoadResult::Loaded {
                    index,
                    skipped_rows,
                }
            }
            RegistrySource::Csv(path) => {
                if !path.exists() {
                    return IndexLoadResult::Missing {
                        index: NameIndex::sample(),
                        path: path.clone(),
                    };
                }
                match load_csv(path) {
                    Ok((index, skipped_rows)) => IndexLoadResult::Loaded {
                        index,
                        skipped_rows,
                    },
                    Err(e) => IndexLoadResult::Failed {
                        index: NameIndex::fallback(),
                        reason: e.to_string(),
                    },
                }
            }
        }
    }
}

/// Read a registry CSV. Malformed or incomplete rows are skipped; only a
/// failure to open the file or read its header is an error.
fn load_csv(path: &Path) -> Result<(NameIndex, usize)> {
    info!("Loading registry data from {}", path.display());
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    reader.headers()?;

    let mut index = NameIndex::new();
    let mut skipped = 0usize;
    for (line, record) in reader.deserialize::<RegistryRow>().enumerate() {
        match record {
            Ok(row) => {
                if !index.insert_row(&row) {
                    skipped += 1;
                }
            }
            Err(e) => {
                warn!("Error processing registry row {}: {}", line + 1, e);
                skipped += 1;
            }
        }
    }
    Ok((index, skipped))
}
