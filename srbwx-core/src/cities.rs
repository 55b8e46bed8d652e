//! The fixed set of cities offered for selection.
//!
//! Order matters: it is the display order and the tie-break order of
//! [`crate::geo::nearest_city`].

use crate::model::City;

pub static CANDIDATE_CITIES: [City; 10] = [
    City::candidate("Beograd", "Belgrade", 44.7866, 20.4489),
    City::candidate("Novi Sad", "Novi Sad", 45.2671, 19.8335),
    City::candidate("Niš", "Niš", 43.3209, 21.8958),
    City::candidate("Kragujevac", "Kragujevac", 44.0128, 20.9114),
    City::candidate("Subotica", "Subotica", 46.1, 19.6667),
    City::candidate("Zrenjanin", "Zrenjanin", 45.3836, 20.381),
    City::candidate("Pirot", "Pirot", 43.153, 22.5861),
    City::candidate("Kraljevo", "Kraljevo", 43.7239, 20.6876),
    City::candidate("Čačak", "Čačak", 43.8914, 20.3497),
    City::candidate("Užice", "Užice", 43.8586, 19.8488),
];

/// City used when nothing has been selected yet.
pub fn default_city() -> City {
    CANDIDATE_CITIES[0].clone()
}

/// Candidates whose name or display name contains `query`, case-insensitively.
///
/// An empty query matches everything.
pub fn search_cities(query: &str) -> Vec<&'static City> {
    let q = query.trim().to_lowercase();

    CANDIDATE_CITIES
        .iter()
        .filter(|c| matches_query(c, &q))
        .collect()
}

fn matches_query(city: &City, q: &str) -> bool {
    let haystack = format!("{} {}", city.name, city.display_name);
    haystack.to_lowercase().contains(q)
}

/// Exact lookup by name or display name (case-insensitive).
pub fn find_city(name: &str) -> Option<&'static City> {
    let wanted = name.trim().to_lowercase();

    CANDIDATE_CITIES.iter().find(|c| is_named(c, &wanted))
}

fn is_named(city: &City, wanted: &str) -> bool {
    city.name.to_lowercase() == wanted || city.display_name.to_lowercase() == wanted
}
