//! Typed client for the Provider Gateway (the data access layer the
//! selection engine runs on).
//!
//! One request function per gateway action. The genre list is memoized for
//! the client's lifetime since it is static reference data; discovery is
//! never cached because the gateway randomizes its result per call.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::models::{DiscoverQuery, Genre, Movie};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced by gateway requests
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Backend seam for the selection engine.
///
/// Implemented by [`GatewayClient`] over HTTP; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieData: Send + Sync {
    /// Genre vocabulary for the filter controls
    async fn genres(&self) -> ClientResult<Vec<Genre>>;

    /// Detail lookup, used to restore a movie referenced by a shared link
    async fn movie_by_id(&self, movie_id: u64) -> ClientResult<Movie>;

    /// One randomized page of movies matching the filters
    async fn discover(&self, query: DiscoverQuery) -> ClientResult<Vec<Movie>>;
}

pub struct GatewayClient {
    http_client: reqwest::Client,
    gateway_url: String,
    genres: OnceCell<Vec<Genre>>,
}

impl GatewayClient {
    pub fn new(gateway_url: impl Into<String>) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            gateway_url: gateway_url.into(),
            genres: OnceCell::new(),
        })
    }

    /// Sends one action invocation in the gateway's `queryString` body form
    async fn invoke<T: DeserializeOwned>(&self, query_string: String) -> ClientResult<T> {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            error: String,
        }

        let response = self
            .http_client
            .post(&self.gateway_url)
            .json(&serde_json::json!({ "queryString": query_string }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ClientError::NotFound(message));
            }
            return Err(ClientError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn fetch_genres(&self) -> ClientResult<Vec<Genre>> {
        self.invoke("action=getGenres".to_string()).await
    }
}

fn movies_query_string(query: &DiscoverQuery) -> String {
    let mut query_string = String::from("action=getMovies");
    if let Some(csv) = query.genre_ids_param() {
        query_string.push_str(&format!("&genreIds={}", csv));
    }
    if let Some(min_rating) = query.min_rating {
        query_string.push_str(&format!("&ratingGte={}", min_rating));
    }
    if let Some(year) = query.year {
        query_string.push_str(&format!("&year={}", year));
    }
    query_string
}

#[async_trait::async_trait]
impl MovieData for GatewayClient {
    async fn genres(&self) -> ClientResult<Vec<Genre>> {
        let genres = self
            .genres
            .get_or_try_init(|| self.fetch_genres())
            .await?;
        Ok(genres.clone())
    }

    async fn movie_by_id(&self, movie_id: u64) -> ClientResult<Movie> {
        self.invoke(format!("action=getMovieById&movieId={}", movie_id))
            .await
    }

    async fn discover(&self, query: DiscoverQuery) -> ClientResult<Vec<Movie>> {
        self.invoke(movies_query_string(&query)).await
    }
}
