//! TMDB (The Movie Database) provider.
//!
//! Implements [`MovieProvider`] against the TMDB v3 REST API. Discovery
//! approximates a uniform draw over the whole filtered result set with two
//! requests: a page-1 probe to learn the page count, then a fetch of one
//! uniformly chosen page. TMDB cannot serve "the Nth of 10,000 results"
//! directly, so sampling a page first keeps the protocol at two calls
//! instead of downloading everything.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{movie::year_from_release_date, DiscoverQuery, Genre, Movie},
    services::genre_cache::GenreCache,
    services::providers::MovieProvider,
};

/// TMDB refuses to serve pages past this index regardless of result count.
const MAX_PAGE: u32 = 500;
/// Discovery floor on vote counts; keeps obscure entries with a handful of
/// votes out of the pool.
const MIN_VOTE_COUNT: u32 = 500;
const UNKNOWN_GENRE: &str = "Unknown Genre";

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    results: Vec<MovieSummary>,
    total_pages: u32,
    total_results: u64,
}

/// Entry shape from `/discover/movie`; genres come as bare ids.
#[derive(Debug, Deserialize)]
struct MovieSummary {
    id: u64,
    title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u64>,
    vote_average: Option<f64>,
}

/// Shape from `/movie/{id}`; genres are fully resolved objects.
#[derive(Debug, Deserialize)]
struct MovieDetail {
    id: u64,
    title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    vote_average: Option<f64>,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    genre_cache: Arc<GenreCache>,
}

impl TmdbProvider {
    pub fn new(genre_cache: Arc<GenreCache>, config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            api_url: config.tmdb_api_url.clone(),
            image_url: config.tmdb_image_url.clone(),
            genre_cache,
        })
    }

    async fn fetch_genres(&self) -> AppResult<Vec<Genre>> {
        let url = format!("{}/genre/movie/list", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB genre list returned status {}: {}",
                status, body
            )));
        }

        let list: GenreListResponse = response.json().await?;
        tracing::debug!(genres = list.genres.len(), provider = "tmdb", "Genre list fetched");
        Ok(list.genres)
    }

    fn discover_params(&self, query: &DiscoverQuery) -> Vec<(&'static str, String)> {
        let today = Utc::now().date_naive().to_string();
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("language", "en-US".to_string()),
            ("sort_by", "popularity.desc".to_string()),
            ("include_adult", "false".to_string()),
            ("include_video", "false".to_string()),
            ("vote_count.gte", MIN_VOTE_COUNT.to_string()),
            // Unreleased titles have no business in a "watch tonight" pick.
            ("primary_release_date.lte", today),
        ];

        if let Some(csv) = query.genre_ids_param() {
            params.push(("with_genres", csv));
        }
        if let Some(min_rating) = query.min_rating {
            params.push(("vote_average.gte", min_rating.to_string()));
        }
        if let Some(year) = query.year {
            params.push(("primary_release_year", year.to_string()));
        }

        params
    }

    async fn fetch_discover_page(
        &self,
        params: &[(&'static str, String)],
        page: u32,
    ) -> AppResult<DiscoverResponse> {
        let url = format!("{}/discover/movie", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("page", page.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB discover returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    fn movie_from_summary(
        &self,
        summary: MovieSummary,
        genre_names: &HashMap<u64, String>,
    ) -> Option<Movie> {
        // Entries without a title or description make for a useless card.
        let title = summary.title.filter(|t| !t.is_empty())?;
        let description = summary.overview.filter(|o| !o.is_empty())?;

        let genres = summary
            .genre_ids
            .iter()
            .map(|id| Genre {
                id: *id,
                name: genre_names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
            })
            .collect();

        Some(Movie {
            id: summary.id,
            title,
            description,
            poster_url: summary
                .poster_path
                .map(|path| format!("{}{}", self.image_url, path)),
            year: summary
                .release_date
                .as_deref()
                .and_then(year_from_release_date),
            genres,
            vote_average: summary.vote_average,
        })
    }
}

/// Draws a page index uniformly from `[1, min(total_pages, MAX_PAGE)]`.
fn random_page(total_pages: u32) -> u32 {
    let page_cap = total_pages.clamp(1, MAX_PAGE);
    rand::thread_rng().gen_range(1..=page_cap)
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let genres = self.genre_cache.get_or_fetch(|| self.fetch_genres()).await?;
        Ok(genres.to_vec())
    }

    async fn movie_by_id(&self, movie_id: &str) -> AppResult<Movie> {
        if movie_id.is_empty() || !movie_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::InvalidInput(format!(
                "Invalid movieId: {}",
                movie_id
            )));
        }

        let url = format!("{}/movie/{}", self.api_url, movie_id);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Movie {} not found", movie_id)));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB movie detail returned status {}: {}",
                status, body
            )));
        }

        let detail: MovieDetail = response.json().await?;
        Ok(Movie {
            id: detail.id,
            title: detail.title.unwrap_or_default(),
            description: detail.overview.unwrap_or_default(),
            poster_url: detail
                .poster_path
                .map(|path| format!("{}{}", self.image_url, path)),
            year: detail
                .release_date
                .as_deref()
                .and_then(year_from_release_date),
            genres: detail.genres,
            vote_average: detail.vote_average,
        })
    }

    async fn discover(&self, query: &DiscoverQuery) -> AppResult<Vec<Movie>> {
        let params = self.discover_params(query);

        // Probe page 1 for the size of the filtered result set.
        let probe = self.fetch_discover_page(&params, 1).await?;
        if probe.total_results == 0 {
            tracing::info!(provider = "tmdb", "Discovery matched no movies");
            return Ok(Vec::new());
        }

        let page = random_page(probe.total_pages);
        tracing::debug!(
            page,
            total_pages = probe.total_pages,
            total_results = probe.total_results,
            provider = "tmdb",
            "Sampling discovery page"
        );

        let sampled = self.fetch_discover_page(&params, page).await?;
        let genre_names = self.genre_cache.name_map(|| self.fetch_genres()).await?;

        let movies: Vec<Movie> = sampled
            .results
            .into_iter()
            .filter_map(|summary| self.movie_from_summary(summary, &genre_names))
            .collect();

        tracing::info!(
            page,
            movies = movies.len(),
            provider = "tmdb",
            "Discovery page mapped"
        );
        Ok(movies)
    }
}
