pub mod genre_cache;
pub mod providers;
