//! Geographic name extraction
//!
//! The matcher only needs a flat list of place names found in a query, used
//! to break ties between institutions sharing a name. Extraction sits behind
//! the [`GeoExtractor`] trait; [`Gazetteer`] is a dictionary implementation
//! and [`NoGeoExtractor`] turns the feature off.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Geo extraction errors
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Gazetteer pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Gazetteer file error: {0}")]
    Source(#[from] csv::Error),
}

/// Outcome of one extraction call, consumed by the matcher
pub type GeoExtractionResult = Result<GeoExtraction, GeoError>;

/// Occurrence details for a country found in text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryInfo {
    pub count: usize,
    /// Surface forms the country was found as
    pub found_as: Vec<String>,
}

/// Places found in a piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoExtraction {
    /// Country name → cities of that country found in the text
    pub cities: BTreeMap<String, Vec<String>>,
    /// Country name → occurrence info
    pub countries: BTreeMap<String, CountryInfo>,
}

impl GeoExtraction {
    /// Flatten into a single list: cities (grouped by country), then countries.
    ///
    /// A city listed under several countries appears once per country.
    pub fn geonames(&self) -> Vec<String> {
        self.cities
            .values()
            .flatten()
            .chain(self.countries.keys())
            .cloned()
            .collect()
    }
}

/// Capability that finds city and country names in free text
pub trait GeoExtractor: Send + Sync {
    fn extract(&self, text: &str) -> GeoExtractionResult;
}

/// Extractor that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoExtractor;

impl GeoExtractor for NoGeoExtractor {
    fn extract(&self, _text: &str) -> GeoExtractionResult {
        Ok(GeoExtraction::default())
    }
}

/// Kind of a gazetteer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    City,
    Country,
}

/// One row of a gazetteer file (`name,kind,country`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaceEntry {
    pub name: String,
    pub kind: PlaceKind,
    /// Owning country for cities; ignored for countries
    #[serde(default)]
    pub country: String,
}

impl PlaceEntry {
    pub fn city(name: &str, country: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PlaceKind::City,
            country: country.to_string(),
        }
    }

    pub fn country(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PlaceKind::Country,
            country: name.to_string(),
        }
    }
}

/// Built-in places: (name, country); an empty country marks a country entry
const BUILTIN_PLACES: &[(&str, &str)] = &[
    ("United States", ""),
    ("United Kingdom", ""),
    ("Canada", ""),
    ("Australia", ""),
    ("Germany", ""),
    ("France", ""),
    ("Spain", ""),
    ("Italy", ""),
    ("Netherlands", ""),
    ("Switzerland", ""),
    ("Sweden", ""),
    ("Brazil", ""),
    ("Mexico", ""),
    ("China", ""),
    ("Japan", ""),
    ("India", ""),
    ("South Korea", ""),
    ("Ireland", ""),
    ("New Zealand", ""),
    ("Cambridge", "United States"),
    ("Cambridge", "United Kingdom"),
    ("Boston", "United States"),
    ("New York", "United States"),
    ("Chicago", "United States"),
    ("Los Angeles", "United States"),
    ("San Francisco", "United States"),
    ("Berkeley", "United States"),
    ("Springfield", "United States"),
    ("Portland", "United States"),
    ("Columbia", "United States"),
    ("London", "United Kingdom"),
    ("London", "Canada"),
    ("Oxford", "United Kingdom"),
    ("Oxford", "United States"),
    ("Manchester", "United Kingdom"),
    ("Edinburgh", "United Kingdom"),
    ("Dublin", "Ireland"),
    ("Toronto", "Canada"),
    ("Montreal", "Canada"),
    ("Vancouver", "Canada"),
    ("Sydney", "Australia"),
    ("Melbourne", "Australia"),
    ("Berlin", "Germany"),
    ("Munich", "Germany"),
    ("Hamburg", "Germany"),
    ("Paris", "France"),
    ("Lyon", "France"),
    ("Madrid", "Spain"),
    ("Barcelona", "Spain"),
    ("Rome", "Italy"),
    ("Milan", "Italy"),
    ("Amsterdam", "Netherlands"),
    ("Zurich", "Switzerland"),
    ("Geneva", "Switzerland"),
    ("Stockholm", "Sweden"),
    ("Sao Paulo", "Brazil"),
    ("São Paulo", "Brazil"),
    ("Mexico City", "Mexico"),
    ("Beijing", "China"),
    ("Shanghai", "China"),
    ("Tokyo", "Japan"),
    ("Kyoto", "Japan"),
    ("Delhi", "India"),
    ("Mumbai", "India"),
    ("Seoul", "South Korea"),
    ("Auckland", "New Zealand"),
];

/// Dictionary-based place extractor.
///
/// Matching is case-sensitive and whole-word; when two names start at the
/// same position the longer one wins ("New York" over "York").
pub struct Gazetteer {
    /// Surface name → entries carrying that name
    entries: HashMap<String, Vec<PlaceEntry>>,
    matcher: Option<Regex>,
}

impl Gazetteer {
    /// Build from explicit entries
    pub fn new(places: impl IntoIterator<Item = PlaceEntry>) -> Result<Self, GeoError> {
        let mut entries: HashMap<String, Vec<PlaceEntry>> = HashMap::new();
        for place in places {
            let name = place.name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            let bucket = entries.entry(name).or_default();
            if !bucket.contains(&place) {
                bucket.push(place);
            }
        }

        let mut names: Vec<&String> = entries.keys().collect();
        names.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

        let matcher = if names.is_empty() {
            None
        } else {
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
                    .size_limit(64 * 1024 * 1024)
                    .build()?,
            )
        };

        Ok(Self { entries, matcher })
    }

    /// Gazetteer holding only the built-in place list
    pub fn builtin() -> Result<Self, GeoError> {
        Self::new(builtin_places())
    }

    /// Built-in places extended with a `name,kind,country` CSV file
    pub fn with_file(path: &Path) -> Result<Self, GeoError> {
        let mut places = builtin_places();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let before = places.len();
        for record in reader.deserialize::<PlaceEntry>() {
            places.push(record?);
        }
        info!(
            "Loaded {} gazetteer entries from {}",
            places.len() - before,
            path.display()
        );
        Self::new(places)
    }

    /// Number of distinct surface names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn builtin_places() -> Vec<PlaceEntry> {
    BUILTIN_PLACES
        .iter()
        .map(|(name, country)| {
            if country.is_empty() {
                PlaceEntry::country(name)
            } else {
                PlaceEntry::city(name, country)
            }
        })
        .collect()
}

impl GeoExtractor for Gazetteer {
    fn extract(&self, text: &str) -> GeoExtractionResult {
        let mut extraction = GeoExtraction::default();
        let Some(matcher) = &self.matcher else {
            return Ok(extraction);
        };

        for found in matcher.find_iter(text) {
            let surface = found.as_str();
            let Some(places) = self.entries.get(surface) else {
                continue;
            };
            for place in places {
                match place.kind {
                    PlaceKind::City => {
                        let cities = extraction.cities.entry(place.country.clone()).or_default();
                        if !cities.contains(&place.name) {
                            cities.push(place.name.clone());
                        }
                    }
                    PlaceKind::Country => {
                        let info = extraction.countries.entry(place.name.clone()).or_default();
                        info.count += 1;
                        if !info.found_as.iter().any(|f| f == surface) {
                            info.found_as.push(surface.to_string());
                        }
                    }
                }
            }
        }

        debug!(
            cities = extraction.cities.len(),
            countries = extraction.countries.len(),
            "Geo extraction complete"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Gazetteer {
        Gazetteer::new(vec![
            PlaceEntry::country("United Kingdom"),
            PlaceEntry::city("Cambridge", "United Kingdom"),
            PlaceEntry::city("Cambridge", "United States"),
            PlaceEntry::city("York", "United Kingdom"),
            PlaceEntry::city("New York", "United States"),
        ])
        .unwrap()
    }

    #[test]
    fn test_finds_cities_and_countries() {
        let found = small()
            .extract("Dept of Physics, Cambridge, United Kingdom")
            .unwrap();
        assert_eq!(found.cities["United Kingdom"], vec!["Cambridge"]);
        assert_eq!(found.cities["United States"], vec!["Cambridge"]);
        assert_eq!(found.countries["United Kingdom"].count, 1);
        assert_eq!(
            found.geonames(),
            vec!["Cambridge", "Cambridge", "United Kingdom"]
        );
    }

    #[test]
    fn test_prefers_longer_names() {
        let found = small().extract("Columbia University, New York").unwrap();
        assert_eq!(found.geonames(), vec!["New York"]);
        assert!(!found.cities.contains_key("United Kingdom"));
    }

    #[test]
    fn test_whole_words_and_case_sensitive() {
        let found = small().extract("Yorkshire cambridge").unwrap();
        assert!(found.geonames().is_empty());
    }

    #[test]
    fn test_empty_gazetteer_finds_nothing() {
        let gazetteer = Gazetteer::new(Vec::new()).unwrap();
        assert!(gazetteer.is_empty());
        assert_eq!(gazetteer.extract("London").unwrap(), GeoExtraction::default());
    }

    #[test]
    fn test_builtin_list_compiles() {
        let gazetteer = Gazetteer::builtin().unwrap();
        assert!(!gazetteer.is_empty());
        let names = gazetteer.extract("University of Toronto, Canada").unwrap().geonames();
        assert_eq!(names, vec!["Toronto", "Canada"]);
    }

    #[test]
    fn test_with_file_extends_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.csv");
        std::fs::write(
            &path,
            "name,kind,country\nHeidelberg,city,Germany\nNorway,country,\n",
        )
        .unwrap();

        let gazetteer = Gazetteer::with_file(&path).unwrap();
        let names = gazetteer.extract("Heidelberg University, Norway").unwrap().geonames();
        assert_eq!(names, vec!["Heidelberg", "Norway"]);
    }

    #[test]
    fn test_no_geo_extractor() {
        assert!(NoGeoExtractor.extract("London, United Kingdom").unwrap().geonames().is_empty());
    }
}
