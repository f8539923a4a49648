pub mod filter;
pub mod movie;

pub use filter::{DiscoverQuery, FilterState};
pub use movie::{Genre, Movie};
