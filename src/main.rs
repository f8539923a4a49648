use std::sync::Arc;

use flickpick::{
    api::{create_router, AppState},
    config::Config,
    services::{genre_cache::GenreCache, providers::TmdbProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "flickpick=debug,tower_http=info".to_string());
    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    // A missing TMDB_API_KEY is fatal here, before the server accepts traffic.
    let config = Config::from_env()?;

    let genre_cache = Arc::new(GenreCache::new());
    let provider = TmdbProvider::new(genre_cache, &config)?;
    let state = AppState::new(Arc::new(provider));
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
