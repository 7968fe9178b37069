//! Waypoint catalog: named locations with coordinates and aliases.
//!
//! The catalog is loaded once at startup from a JSON mapping of canonical
//! name to `{ "location": "<lat>,<lon>", "aliases": [...] }` and is immutable
//! afterwards. Free-text lookups go through [`WaypointCatalog::resolve`],
//! which never guesses: low-confidence input comes back as
//! [`Resolution::Ambiguous`] or [`Resolution::Unresolved`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::similarity::{normalize, token_set_score};

/// Score at or above which a fuzzy match is accepted outright.
/// Below this, a typo and a different place are hard to tell apart.
pub const ACCEPT_SCORE: u8 = 80;

/// Score at or above which a candidate is offered back as a suggestion.
const SUGGEST_SCORE: u8 = 60;

/// Maximum number of candidates reported for an ambiguous query.
const MAX_CANDIDATES: usize = 3;

/// Longest accepted canonical name or alias.
/// Keeps every rendered route line far below a single message's size limit.
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted latitude or longitude text.
/// Far more precision than any map link needs.
const MAX_COORDINATE_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    fn parse(raw: &str) -> Option<Self> {
        let (lat, lon) = raw.split_once(',')?;
        let lat = parse_degrees(lat)?;
        let lon = parse_degrees(lon)?;
        let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }
}

/// Plain decimal degrees only: no exponents, `inf` or `NaN`.
fn parse_degrees(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let plain = !raw.is_empty()
        && raw.len() <= MAX_COORDINATE_LENGTH
        && raw
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+')));
    if !plain {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub location: Coordinate,
    pub aliases: Vec<String>,
}

impl Waypoint {
    pub fn maps_link(&self) -> String {
        format!("https://maps.google.com/?q={}", self.location)
    }
}

/// Outcome of a free-text lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(Arc<Waypoint>),
    /// Plausible candidates exist but none is confident enough to pick.
    Ambiguous(Vec<Arc<Waypoint>>),
    /// Nothing close; `suggestions` may still hold weak candidates.
    Unresolved { suggestions: Vec<Arc<Waypoint>> },
}

#[derive(Debug, Deserialize)]
struct RawWaypoint {
    location: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// One searchable string (canonical name or alias) pointing at a waypoint.
#[derive(Debug)]
struct Choice {
    key: String,
    waypoint: usize,
}

#[derive(Debug, Default)]
pub struct WaypointCatalog {
    waypoints: Vec<Arc<Waypoint>>,
    choices: Vec<Choice>,
    by_name: HashMap<String, usize>,
}

impl WaypointCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&contents)?;
        info!(path = %path.display(), count = catalog.len(), "Loaded waypoint catalog");
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        // BTreeMap keeps catalog order stable regardless of file order.
        let raw: BTreeMap<String, RawWaypoint> = serde_json::from_str(json)?;

        let mut waypoints = Vec::with_capacity(raw.len());
        for (name, entry) in raw {
            let location = Coordinate::parse(&entry.location).ok_or_else(|| {
                CatalogError::MalformedLocation {
                    name: name.clone(),
                    location: entry.location.clone(),
                }
            })?;
            waypoints.push(Waypoint {
                name,
                location,
                aliases: entry.aliases,
            });
        }

        Self::from_waypoints(waypoints)
    }

    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for waypoint in waypoints {
            let key = normalize(&waypoint.name);
            if key.is_empty() || waypoint.name.chars().count() > MAX_NAME_LENGTH {
                return Err(CatalogError::InvalidName {
                    name: waypoint.name,
                });
            }
            if catalog.by_name.contains_key(&key) {
                return Err(CatalogError::DuplicateName {
                    name: waypoint.name,
                });
            }

            let index = catalog.waypoints.len();
            catalog.by_name.insert(key.clone(), index);
            catalog.choices.push(Choice {
                key,
                waypoint: index,
            });
            for alias in &waypoint.aliases {
                let alias_key = normalize(alias);
                if alias_key.is_empty() || alias.chars().count() > MAX_NAME_LENGTH {
                    return Err(CatalogError::InvalidName {
                        name: alias.clone(),
                    });
                }
                catalog.choices.push(Choice {
                    key: alias_key,
                    waypoint: index,
                });
            }
            catalog.waypoints.push(Arc::new(waypoint));
        }

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &Arc<Waypoint>> {
        self.waypoints.iter()
    }

    /// Exact lookup by canonical name, ignoring case and punctuation.
    pub fn get(&self, name: &str) -> Option<Arc<Waypoint>> {
        self.by_name
            .get(&normalize(name))
            .map(|&i| Arc::clone(&self.waypoints[i]))
    }

    /// Resolve free text against every canonical name and alias.
    pub fn resolve(&self, text: &str) -> Resolution {
        let resolution = self.resolve_within(text, |_| true);
        debug!(query = text, ?resolution, "Resolved waypoint");
        resolution
    }

    /// Resolve free text, considering only waypoints accepted by `filter`.
    ///
    /// Used to match against the stops of an existing route with the same
    /// rules as a full catalog lookup.
    pub fn resolve_within(&self, text: &str, filter: impl Fn(&Waypoint) -> bool) -> Resolution {
        let query = normalize(text);
        if query.is_empty() {
            return Resolution::Unresolved {
                suggestions: Vec::new(),
            };
        }

        // Best score per waypoint across its name and aliases.
        let mut best: HashMap<usize, (u8, bool)> = HashMap::new();
        for choice in &self.choices {
            if !filter(&self.waypoints[choice.waypoint]) {
                continue;
            }
            let exact = choice.key == query;
            let score = if exact {
                100
            } else {
                token_set_score(&query, &choice.key)
            };
            let entry = best.entry(choice.waypoint).or_insert((0, false));
            entry.0 = entry.0.max(score);
            entry.1 |= exact;
        }

        let mut ranked: Vec<(bool, u8, &Arc<Waypoint>)> = best
            .into_iter()
            .map(|(index, (score, exact))| (exact, score, &self.waypoints[index]))
            .collect();
        // Exact match first, then highest score, shortest name, lexicographic.
        ranked.sort_by(|(ea, sa, a), (eb, sb, b)| {
            eb.cmp(ea)
                .then_with(|| sb.cmp(sa))
                .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
                .then_with(|| a.name.cmp(&b.name))
        });

        match ranked.first() {
            Some(&(exact, score, waypoint)) if exact || score >= ACCEPT_SCORE => {
                Resolution::Matched(Arc::clone(waypoint))
            }
            Some(_) => {
                let candidates: Vec<Arc<Waypoint>> = ranked
                    .iter()
                    .filter(|(_, score, _)| *score >= SUGGEST_SCORE)
                    .take(MAX_CANDIDATES)
                    .map(|(_, _, w)| Arc::clone(w))
                    .collect();
                if candidates.len() > 1 {
                    Resolution::Ambiguous(candidates)
                } else {
                    Resolution::Unresolved {
                        suggestions: candidates,
                    }
                }
            }
            None => Resolution::Unresolved {
                suggestions: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CATALOG: &str = r#"{
        "Town Hall": { "location": "40.7128,-74.0060", "aliases": ["City Hall"] },
        "Library": { "location": "40.7532,-73.9822" },
        "Central Park Fountain": { "location": "40.7736,-73.9712", "aliases": ["Bethesda"] },
        "Museum of Art": { "location": "40.7794,-73.9632" },
        "Old Clock Tower": { "location": "40.7061,-74.0087" },
        "City Clock": { "location": "40.7000,-74.0100" }
    }"#;

    pub(crate) fn sample_catalog() -> WaypointCatalog {
        WaypointCatalog::from_json(SAMPLE_CATALOG).expect("sample catalog should load")
    }

    fn matched_name(resolution: Resolution) -> String {
        match resolution {
            Resolution::Matched(w) => w.name.clone(),
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_load_sample_catalog() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 6);
        let hall = catalog.get("town hall").unwrap();
        assert_eq!(hall.aliases, vec!["City Hall".to_string()]);
        assert_eq!(hall.location, Coordinate { lat: 40.7128, lon: -74.006 });
        assert_eq!(hall.maps_link(), "https://maps.google.com/?q=40.7128,-74.006");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypoints.json");
        std::fs::write(&path, SAMPLE_CATALOG).unwrap();
        let catalog = WaypointCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 6);

        let missing = WaypointCatalog::load(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn test_malformed_location_is_rejected() {
        for location in [
            "40.7",
            "north,south",
            "91,0",
            "0,181",
            "",
            "1e-300,0",
            "0,inf",
            "NaN,0",
            "0.000000000000000000000001,0",
        ] {
            let json = format!(r#"{{ "Bad": {{ "location": "{}" }} }}"#, location);
            let result = WaypointCatalog::from_json(&json);
            assert!(
                matches!(result, Err(CatalogError::MalformedLocation { .. })),
                "location {:?} should be rejected",
                location
            );
        }
    }

    #[test]
    fn test_missing_location_is_rejected() {
        let result = WaypointCatalog::from_json(r#"{ "Bad": { "aliases": [] } }"#);
        assert!(matches!(result, Err(CatalogError::Json(_))));
    }

    #[test]
    fn test_duplicate_names_case_insensitive() {
        let result = WaypointCatalog::from_json(
            r#"{ "Library": { "location": "1,1" }, "LIBRARY": { "location": "2,2" } }"#,
        );
        assert!(matches!(result, Err(CatalogError::DuplicateName { .. })));
    }

    #[test]
    fn test_resolve_exact_and_alias() {
        let catalog = sample_catalog();
        assert_eq!(matched_name(catalog.resolve("library")), "Library");
        assert_eq!(matched_name(catalog.resolve("CITY HALL")), "Town Hall");
        assert_eq!(matched_name(catalog.resolve("  town   hall! ")), "Town Hall");
        assert_eq!(matched_name(catalog.resolve("bethesda")), "Central Park Fountain");
    }

    #[test]
    fn test_resolve_fuzzy() {
        let catalog = sample_catalog();
        assert_eq!(matched_name(catalog.resolve("libary")), "Library");
        assert_eq!(matched_name(catalog.resolve("art museum")), "Museum of Art");
        assert_eq!(matched_name(catalog.resolve("clock tower")), "Old Clock Tower");
    }

    #[test]
    fn test_resolve_tie_prefers_shortest_name() {
        // "clock" is fully contained in both clock waypoints.
        let catalog = sample_catalog();
        assert_eq!(matched_name(catalog.resolve("clock")), "City Clock");
    }

    #[test]
    fn test_resolve_tie_then_lexicographic() {
        let catalog = WaypointCatalog::from_json(
            r#"{ "Park B": { "location": "1,1" }, "Park A": { "location": "2,2" } }"#,
        )
        .unwrap();
        assert_eq!(matched_name(catalog.resolve("park")), "Park A");
    }

    #[test]
    fn test_resolve_unresolved() {
        let catalog = sample_catalog();
        assert!(matches!(
            catalog.resolve("zzzzzz"),
            Resolution::Unresolved { suggestions } if suggestions.is_empty()
        ));
        assert!(matches!(catalog.resolve("   "), Resolution::Unresolved { .. }));
    }

    #[test]
    fn test_resolve_ambiguous_between_weak_candidates() {
        let catalog = WaypointCatalog::from_json(
            r#"{ "Pier Aaaa": { "location": "1,1" }, "Pier Bbbb": { "location": "2,2" } }"#,
        )
        .unwrap();
        // Two edits away from each name: plausible, but not confident.
        match catalog.resolve("pier abab") {
            Resolution::Ambiguous(candidates) => {
                let names: Vec<&str> = candidates.iter().map(|w| w.name.as_str()).collect();
                assert_eq!(names, vec!["Pier Aaaa", "Pier Bbbb"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_within_filters_candidates() {
        let catalog = sample_catalog();
        let resolution = catalog.resolve_within("city hall", |w| w.name == "Library");
        assert!(matches!(resolution, Resolution::Unresolved { .. }));

        let resolution = catalog.resolve_within("city hall", |w| w.name == "Town Hall");
        assert_eq!(matched_name(resolution), "Town Hall");
    }
}
