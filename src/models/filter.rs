use std::collections::BTreeSet;

use chrono::{Datelike, Utc};

/// Filters carried by a discovery request, as the gateway understands them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverQuery {
    /// Genre ids the results must match; empty means no genre filter
    pub genre_ids: Vec<u64>,
    /// Minimum vote average; `None` means no threshold
    pub min_rating: Option<f64>,
    /// Restrict results to this primary release year
    pub year: Option<i32>,
}

impl DiscoverQuery {
    /// Comma-separated genre ids in wire form, or `None` when unfiltered
    pub fn genre_ids_param(&self) -> Option<String> {
        if self.genre_ids.is_empty() {
            return None;
        }
        let csv = self
            .genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Some(csv)
    }
}

/// The user's current filter selections, owned by the selection engine
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// Selected genre ids; unordered, capped by the UI at three
    pub selected_genre_ids: BTreeSet<u64>,
    /// Minimum rating threshold in `[0, 10]`; 0 disables the filter
    pub min_rating: f64,
    /// Only pick movies released this calendar year
    pub restrict_to_current_year: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            selected_genre_ids: BTreeSet::new(),
            min_rating: 0.0,
            restrict_to_current_year: false,
        }
    }
}

impl FilterState {
    /// Maps the current selections into provider query parameters
    pub fn to_discover_query(&self) -> DiscoverQuery {
        DiscoverQuery {
            genre_ids: self.selected_genre_ids.iter().copied().collect(),
            min_rating: (self.min_rating > 0.0).then_some(self.min_rating),
            year: self
                .restrict_to_current_year
                .then(|| Utc::now().year()),
        }
    }
}
