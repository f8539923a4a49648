//! flickpick: a random movie picker built on the TMDB catalog.
//!
//! The crate ships three layers:
//! - `api` + `services`: the Provider Gateway, an axum service that relays
//!   to TMDB with a server-held API key and normalizes its responses.
//! - `client`: the typed data access layer front-ends use to talk to the
//!   gateway.
//! - `picker`: the selection engine driving the "find me a movie" flow.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod picker;
pub mod services;
