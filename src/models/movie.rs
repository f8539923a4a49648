use serde::{Deserialize, Serialize};

/// A movie genre from the metadata provider's vocabulary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// The normalized movie shape returned by the gateway and displayed by clients.
///
/// Wire format keeps `posterUrl` camelCase but `vote_average` snake_case,
/// matching what deployed front-ends already parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(rename = "posterUrl", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
}

/// Extracts the 4-digit year from a provider release date (`YYYY-MM-DD`).
pub fn year_from_release_date(release_date: &str) -> Option<i32> {
    release_date.split('-').next()?.parse().ok()
}
