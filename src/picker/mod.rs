//! The selection engine: owns the user's filter state and implements the
//! retry-and-random-pick policy on top of the data access layer.
//!
//! Commands are explicit method calls (no implicit re-fetch on state
//! change): the view forwards a user intent, the engine runs the fetch
//! sequence, and the view re-renders from [`MoviePicker::result`] and the
//! drained notices.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use tokio::sync::RwLock;

use crate::client::MovieData;
use crate::models::{FilterState, Genre, Movie};

/// Retry ceiling for discovery attempts that come back empty.
const MAX_ATTEMPTS: u32 = 3;
/// UI convention: at most this many genres can be selected at once.
pub const MAX_SELECTED_GENRES: usize = 3;

/// A user-facing notification produced by an engine command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Shown as an error toast
    Error(String),
    /// Shown as an informational toast
    Info(String),
}

/// Snapshot of the engine's outputs, consumed by the view layer
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub movie: Option<Movie>,
    pub is_loading: bool,
    pub has_searched: bool,
}

struct PickerInner {
    filter: FilterState,
    movie: Option<Movie>,
    is_loading: bool,
    has_searched: bool,
    genres: Vec<Genre>,
    genres_available: bool,
    notices: Vec<Notice>,
}

pub struct MoviePicker {
    data: Arc<dyn MovieData>,
    inner: RwLock<PickerInner>,
    /// Latch ensuring at most one discovery loop is in flight.
    in_flight: AtomicBool,
    /// Bumped by filter changes; a loop started under an older generation
    /// must not commit its result.
    generation: AtomicU64,
}

impl MoviePicker {
    pub fn new(data: Arc<dyn MovieData>) -> Self {
        Self {
            data,
            inner: RwLock::new(PickerInner {
                filter: FilterState::default(),
                movie: None,
                is_loading: false,
                has_searched: false,
                genres: Vec::new(),
                genres_available: false,
                notices: Vec::new(),
            }),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Fetches the genre vocabulary for the filter controls.
    ///
    /// Failure degrades the filter UI to "no categories available" without
    /// blocking movie search.
    pub async fn load_genres(&self) {
        match self.data.genres().await {
            Ok(genres) => {
                let mut inner = self.inner.write().await;
                inner.genres = genres;
                inner.genres_available = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Genre list fetch failed");
                let mut inner = self.inner.write().await;
                inner.genres_available = false;
                inner
                    .notices
                    .push(Notice::Error(format!("Failed to fetch categories: {}", e)));
            }
        }
    }

    /// Replaces the genre selection. Does not fetch; the next explicit
    /// find command does. Clears the displayed movie, which may no longer
    /// match the new filters.
    pub async fn apply_filter(&self, genre_ids: Vec<u64>) {
        let selection: BTreeSet<u64> = genre_ids
            .into_iter()
            .take(MAX_SELECTED_GENRES)
            .collect();

        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut inner = self.inner.write().await;
        inner.filter.selected_genre_ids = selection;
        inner.movie = None;
    }

    pub async fn set_min_rating(&self, value: f64) {
        let mut inner = self.inner.write().await;
        inner.filter.min_rating = value.clamp(0.0, 10.0);
    }

    pub async fn set_year_restriction(&self, enabled: bool) {
        let mut inner = self.inner.write().await;
        inner.filter.restrict_to_current_year = enabled;
    }

    /// Runs the discovery loop: up to [`MAX_ATTEMPTS`] sequential attempts,
    /// retrying only on empty pages, then a uniform pick from the winning
    /// page. Inert while a previous loop is still in flight (the view
    /// disables the trigger while loading).
    pub async fn find_random_movie(&self) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Discovery already in flight, ignoring command");
            return;
        }

        let generation = self.generation.load(Ordering::Acquire);
        let query = {
            let mut inner = self.inner.write().await;
            inner.has_searched = true;
            inner.is_loading = true;
            // Show the loading placeholder, not a stale card.
            inner.movie = None;
            inner.filter.to_discover_query()
        };

        let mut picked: Option<Movie> = None;
        let mut failed = false;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.data.discover(query.clone()).await {
                Ok(movies) if !movies.is_empty() => {
                    let index = rand::thread_rng().gen_range(0..movies.len());
                    picked = movies.into_iter().nth(index);
                    break;
                }
                Ok(_) => {
                    // The gateway samples a random page per call, so a retry
                    // can land on a populated page.
                    tracing::debug!(attempt, "Discovery returned an empty page, retrying");
                }
                Err(e) => {
                    // Transport and provider failures are not page-related;
                    // retrying would just mask them.
                    tracing::warn!(attempt, error = %e, "Discovery failed");
                    failed = true;
                    let mut inner = self.inner.write().await;
                    inner
                        .notices
                        .push(Notice::Error(format!("Failed to fetch movies: {}", e)));
                    break;
                }
            }
        }

        let mut inner = self.inner.write().await;
        if self.generation.load(Ordering::Acquire) == generation {
            match picked {
                Some(movie) => inner.movie = Some(movie),
                None if !failed => {
                    let message = no_match_message(&inner.filter, &inner.genres);
                    inner.notices.push(Notice::Info(message));
                }
                None => {}
            }
        } else {
            tracing::debug!("Search superseded by a filter change, discarding result");
        }
        inner.is_loading = false;
        drop(inner);

        self.in_flight.store(false, Ordering::Release);
    }

    /// Loads the movie referenced by a shared `?movie=<id>` link, bypassing
    /// discovery. Returns whether the URL parameter should be kept; an
    /// invalid or unresolvable id yields one error notice and `false`.
    pub async fn restore_shared_movie(&self, raw_id: &str) -> bool {
        let movie_id = match raw_id.parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                let mut inner = self.inner.write().await;
                inner
                    .notices
                    .push(Notice::Error(format!("Invalid movie link: {}", raw_id)));
                return false;
            }
        };

        match self.data.movie_by_id(movie_id).await {
            Ok(movie) => {
                let mut inner = self.inner.write().await;
                inner.movie = Some(movie);
                true
            }
            Err(e) => {
                tracing::warn!(movie_id, error = %e, "Shared movie restore failed");
                let mut inner = self.inner.write().await;
                inner
                    .notices
                    .push(Notice::Error(format!("Failed to load shared movie: {}", e)));
                false
            }
        }
    }

    /// Query-parameter form of the displayed movie, for shareable links
    pub async fn share_query(&self) -> Option<String> {
        let inner = self.inner.read().await;
        inner.movie.as_ref().map(|movie| format!("movie={}", movie.id))
    }

    pub async fn result(&self) -> SelectionResult {
        let inner = self.inner.read().await;
        SelectionResult {
            movie: inner.movie.clone(),
            is_loading: inner.is_loading,
            has_searched: inner.has_searched,
        }
    }

    pub async fn filter(&self) -> FilterState {
        self.inner.read().await.filter.clone()
    }

    /// Genre vocabulary, empty until [`MoviePicker::load_genres`] succeeds
    pub async fn genres(&self) -> Vec<Genre> {
        self.inner.read().await.genres.clone()
    }

    pub async fn genres_available(&self) -> bool {
        self.inner.read().await.genres_available
    }

    /// Drains pending notifications. Each causing command produces at most
    /// one notice, so the view can toast them verbatim.
    pub async fn take_notices(&self) -> Vec<Notice> {
        let mut inner = self.inner.write().await;
        std::mem::take(&mut inner.notices)
    }
}

fn no_match_message(filter: &FilterState, genres: &[Genre]) -> String {
    let selection = {
        let names: Vec<&str> = genres
            .iter()
            .filter(|genre| filter.selected_genre_ids.contains(&genre.id))
            .map(|genre| genre.name.as_str())
            .collect();
        if names.is_empty() {
            "the current selection".to_string()
        } else {
            format!("'{}'", names.join(", "))
        }
    };

    format!(
        "No movies found for {} with a rating of {:.1} or higher. Try different filters!",
        selection, filter.min_rating
    )
}
