use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::DiscoverQuery,
};

use super::AppState;

/// Parameters accepted by the action endpoint, in any transport form
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ActionParams {
    pub action: Option<String>,
    #[serde(rename = "movieId")]
    pub movie_id: Option<String>,
    #[serde(rename = "genreIds")]
    pub genre_ids: Option<String>,
    #[serde(rename = "ratingGte")]
    pub rating_gte: Option<String>,
    pub year: Option<String>,
}

/// POST body: either an encoded query string or the fields inline
#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    #[serde(rename = "queryString")]
    pub query_string: Option<String>,
    #[serde(flatten)]
    pub params: ActionParams,
}

/// Action dispatch for GET requests (parameters in the URL)
pub async fn dispatch_get(
    State(state): State<AppState>,
    Query(params): Query<ActionParams>,
) -> AppResult<Json<Value>> {
    dispatch(state, params).await
}

/// Action dispatch for POST requests.
///
/// Accepts `{ "queryString": "action=..&.." }` (the form existing clients
/// send), inline JSON fields, or falls back to URL query parameters when the
/// body carries no action.
pub async fn dispatch_post(
    State(state): State<AppState>,
    Query(url_params): Query<ActionParams>,
    body: Option<Json<ActionBody>>,
) -> AppResult<Json<Value>> {
    let params = match body {
        Some(Json(body)) => {
            if let Some(query_string) = body.query_string {
                serde_urlencoded::from_str(&query_string).map_err(|e| {
                    AppError::InvalidInput(format!("Malformed queryString: {}", e))
                })?
            } else if body.params.action.is_some() {
                body.params
            } else {
                url_params
            }
        }
        None => url_params,
    };

    dispatch(state, params).await
}

async fn dispatch(state: AppState, params: ActionParams) -> AppResult<Json<Value>> {
    match params.action.as_deref() {
        Some("getGenres") => {
            let genres = state.provider.genres().await?;
            Ok(Json(json!(genres)))
        }
        Some("getMovieById") => {
            let movie_id = params
                .movie_id
                .ok_or_else(|| AppError::InvalidInput("movieId is required".to_string()))?;
            let movie = state.provider.movie_by_id(&movie_id).await?;
            Ok(Json(json!(movie)))
        }
        Some("getMovies") => {
            let query = discover_query_from_params(&params)?;
            let movies = state.provider.discover(&query).await?;
            Ok(Json(json!(movies)))
        }
        other => Err(AppError::InvalidInput(format!(
            "Invalid action specified. Received: {}",
            other.unwrap_or("none")
        ))),
    }
}

fn discover_query_from_params(params: &ActionParams) -> AppResult<DiscoverQuery> {
    let genre_ids = match params.genre_ids.as_deref() {
        Some(csv) if !csv.is_empty() => csv
            .split(',')
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.trim()
                    .parse::<u64>()
                    .map_err(|_| AppError::InvalidInput(format!("Invalid genre id: {}", part)))
            })
            .collect::<AppResult<Vec<u64>>>()?,
        _ => Vec::new(),
    };

    let min_rating = params
        .rating_gte
        .as_deref()
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid ratingGte: {}", raw)))
        })
        .transpose()?;

    let year = params
        .year
        .as_deref()
        .map(|raw| {
            raw.parse::<i32>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid year: {}", raw)))
        })
        .transpose()?;

    Ok(DiscoverQuery {
        genre_ids,
        min_rating,
        year,
    })
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
