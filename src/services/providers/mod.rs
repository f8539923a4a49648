/// Movie metadata provider abstraction
///
/// The gateway talks to its upstream metadata source through this trait so
/// handlers can be exercised against a stub and the TMDB implementation can
/// be swapped out without touching the HTTP layer.
use crate::{
    error::AppResult,
    models::{DiscoverQuery, Genre, Movie},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Full genre vocabulary, cached for the process lifetime
    async fn genres(&self) -> AppResult<Vec<Genre>>;

    /// Detail lookup for a single movie id
    async fn movie_by_id(&self, movie_id: &str) -> AppResult<Movie>;

    /// One randomized page of movies matching the filters
    ///
    /// Returns an empty list when nothing matches; that is not an error.
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<Movie>>;
}
