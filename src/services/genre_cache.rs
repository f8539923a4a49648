use std::collections::HashMap;
use std::future::Future;

use tokio::sync::OnceCell;

use crate::error::AppResult;
use crate::models::Genre;

/// Process-scoped cache for the provider's genre vocabulary.
///
/// Populated at most once per process and immutable afterwards; the genre
/// list is effectively static reference data with no invalidation path.
/// Injected into the provider so the cache has an explicit owner instead of
/// living as ambient module state.
#[derive(Debug, Default)]
pub struct GenreCache {
    genres: OnceCell<Vec<Genre>>,
}

impl GenreCache {
    pub fn new() -> Self {
        Self {
            genres: OnceCell::new(),
        }
    }

    /// Returns the cached genre list, populating it with `fetch` on first use.
    ///
    /// A failed fetch leaves the cache empty so a later call can retry.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> AppResult<&[Genre]>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<Genre>>>,
    {
        let genres = self.genres.get_or_try_init(fetch).await?;
        Ok(genres)
    }

    /// Builds an id-to-name lookup from the cached list
    pub async fn name_map<F, Fut>(&self, fetch: F) -> AppResult<HashMap<u64, String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<Genre>>>,
    {
        let genres = self.get_or_fetch(fetch).await?;
        Ok(genres
            .iter()
            .map(|genre| (genre.id, genre.name.clone()))
            .collect())
    }
}
