//! Exercises the TMDB provider against a local stub upstream, covering the
//! two-request random-page discovery protocol end to end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use flickpick::config::Config;
use flickpick::error::AppError;
use flickpick::models::DiscoverQuery;
use flickpick::services::genre_cache::GenreCache;
use flickpick::services::providers::{MovieProvider, TmdbProvider};

#[derive(Clone)]
struct Upstream {
    total_pages: u32,
    total_results: u64,
    fail_discover: bool,
    genre_requests: Arc<Mutex<u32>>,
    discover_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Upstream {
    fn new(total_pages: u32, total_results: u64) -> Self {
        Self {
            total_pages,
            total_results,
            fail_discover: false,
            genre_requests: Arc::new(Mutex::new(0)),
            discover_queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn pages_requested(&self) -> Vec<u32> {
        self.discover_queries
            .lock()
            .unwrap()
            .iter()
            .map(|params| params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0))
            .collect()
    }
}

async fn genre_list(State(upstream): State<Upstream>) -> Json<serde_json::Value> {
    *upstream.genre_requests.lock().unwrap() += 1;
    Json(json!({ "genres": [{ "id": 28, "name": "Action" }] }))
}

async fn discover(
    State(upstream): State<Upstream>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if upstream.fail_discover {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status_message": "Internal error" })),
        )
            .into_response();
    }

    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    upstream.discover_queries.lock().unwrap().push(params);

    if upstream.total_results == 0 {
        return Json(json!({
            "page": page,
            "results": [],
            "total_pages": 1,
            "total_results": 0
        }))
        .into_response();
    }

    // One complete entry per page plus two that must be dropped during
    // mapping (blank overview, missing title).
    Json(json!({
        "page": page,
        "results": [
            {
                "id": page * 1000 + 1,
                "title": "Heat",
                "overview": "A cat-and-mouse chase across Los Angeles",
                "poster_path": "/heat.jpg",
                "release_date": "1995-12-15",
                "genre_ids": [28, 53],
                "vote_average": 8.3
            },
            {
                "id": page * 1000 + 2,
                "title": "Mystery Reel",
                "overview": "",
                "genre_ids": [],
                "vote_average": 5.0
            },
            {
                "id": page * 1000 + 3,
                "title": null,
                "overview": "Lost its title somewhere",
                "genre_ids": []
            }
        ],
        "total_pages": upstream.total_pages,
        "total_results": upstream.total_results
    }))
    .into_response()
}

async fn movie_detail(Path(id): Path<u64>) -> Response {
    if id == 603 {
        Json(json!({
            "id": 603,
            "title": "The Matrix",
            "overview": "A hacker learns the truth about his reality",
            "poster_path": "/matrix.jpg",
            "release_date": "1999-03-31",
            "genres": [{ "id": 878, "name": "Science Fiction" }],
            "vote_average": 8.2
        }))
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "status_message": "The resource you requested could not be found." })),
        )
            .into_response()
    }
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/genre/movie/list", get(genre_list))
        .route("/discover/movie", get(discover))
        .route("/movie/:id", get(movie_detail))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn provider_for(base_url: String) -> TmdbProvider {
    let config = Config {
        tmdb_api_key: "test-key".to_string(),
        tmdb_api_url: base_url,
        tmdb_image_url: "https://image.tmdb.org/t/p/w500".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 5,
    };
    TmdbProvider::new(Arc::new(GenreCache::new()), &config).unwrap()
}

#[tokio::test]
async fn test_empty_result_set_short_circuits() {
    let upstream = Upstream::new(1, 0);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let movies = provider.discover(&DiscoverQuery::default()).await.unwrap();
    assert!(movies.is_empty());

    // Only the page-1 probe; no random page fetch, no genre lookup.
    assert_eq!(upstream.pages_requested(), vec![1]);
    assert_eq!(*upstream.genre_requests.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_two_request_protocol_and_mapping() {
    let upstream = Upstream::new(10, 200);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let movies = provider.discover(&DiscoverQuery::default()).await.unwrap();

    let pages = upstream.pages_requested();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0], 1);
    assert!((1..=10).contains(&pages[1]));

    // Incomplete entries are dropped; the survivor is fully normalized.
    assert_eq!(movies.len(), 1);
    let movie = &movies[0];
    assert_eq!(movie.title, "Heat");
    assert_eq!(
        movie.poster_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/heat.jpg")
    );
    assert_eq!(movie.year, Some(1995));
    assert_eq!(movie.genres[0].name, "Action");
    assert_eq!(movie.genres[1].name, "Unknown Genre");
    assert_eq!(movie.vote_average, Some(8.3));
}

#[tokio::test]
async fn test_sampled_pages_are_spread_across_the_range() {
    let upstream = Upstream::new(5, 100);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let trials = 150;
    for _ in 0..trials {
        provider.discover(&DiscoverQuery::default()).await.unwrap();
    }

    let pages = upstream.pages_requested();
    let sampled: Vec<u32> = pages.chunks(2).map(|pair| pair[1]).collect();
    assert_eq!(sampled.len(), trials);
    assert!(sampled.iter().all(|page| (1..=5).contains(page)));

    // A uniform draw must not collapse onto page 1.
    let mut distinct: Vec<u32> = sampled.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert!(distinct.len() >= 4, "saw only pages {:?}", distinct);
    let page_one = sampled.iter().filter(|&&page| page == 1).count();
    assert!(page_one < trials * 6 / 10);
}

#[tokio::test]
async fn test_sampling_respects_the_provider_page_cap() {
    let upstream = Upstream::new(5000, 100_000);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    for _ in 0..25 {
        provider.discover(&DiscoverQuery::default()).await.unwrap();
    }

    let pages = upstream.pages_requested();
    let sampled: Vec<u32> = pages.chunks(2).map(|pair| pair[1]).collect();
    assert!(sampled.iter().all(|&page| page <= 500));
}

#[tokio::test]
async fn test_genre_cache_fetched_once_per_process() {
    let upstream = Upstream::new(3, 60);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    for _ in 0..5 {
        provider.discover(&DiscoverQuery::default()).await.unwrap();
    }
    provider.genres().await.unwrap();

    assert_eq!(*upstream.genre_requests.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_filters_are_forwarded_upstream() {
    let upstream = Upstream::new(2, 40);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let query = DiscoverQuery {
        genre_ids: vec![28, 12],
        min_rating: Some(7.5),
        year: Some(2025),
    };
    provider.discover(&query).await.unwrap();

    let recorded = upstream.discover_queries.lock().unwrap();
    let probe = &recorded[0];
    assert_eq!(probe.get("api_key").map(String::as_str), Some("test-key"));
    assert_eq!(probe.get("with_genres").map(String::as_str), Some("28,12"));
    assert_eq!(
        probe.get("vote_average.gte").map(String::as_str),
        Some("7.5")
    );
    assert_eq!(
        probe.get("primary_release_year").map(String::as_str),
        Some("2025")
    );
    assert_eq!(probe.get("vote_count.gte").map(String::as_str), Some("500"));
    assert_eq!(
        probe.get("sort_by").map(String::as_str),
        Some("popularity.desc")
    );
    assert!(probe.contains_key("primary_release_date.lte"));

    // The random-page fetch reuses the exact same filters.
    let sampled = &recorded[1];
    assert_eq!(sampled.get("with_genres"), probe.get("with_genres"));
    assert_eq!(sampled.get("vote_average.gte"), probe.get("vote_average.gte"));
}

#[tokio::test]
async fn test_upstream_failure_propagates_as_external_error() {
    let mut upstream = Upstream::new(3, 60);
    upstream.fail_discover = true;
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let result = provider.discover(&DiscoverQuery::default()).await;
    assert!(matches!(result, Err(AppError::ExternalApi(_))));
}

#[tokio::test]
async fn test_movie_by_id_maps_detail_shape() {
    let upstream = Upstream::new(1, 20);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let movie = provider.movie_by_id("603").await.unwrap();
    assert_eq!(movie.id, 603);
    assert_eq!(movie.title, "The Matrix");
    assert_eq!(
        movie.poster_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/matrix.jpg")
    );
    assert_eq!(movie.year, Some(1999));
    assert_eq!(movie.genres[0].name, "Science Fiction");
}

#[tokio::test]
async fn test_movie_by_id_not_found() {
    let upstream = Upstream::new(1, 20);
    let base_url = spawn_upstream(upstream.clone()).await;
    let provider = provider_for(base_url);

    let result = provider.movie_by_id("424242").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
