//! Utility modules supporting the search service.
//!
//! - [`HttpClient`]: shared HTTP client with timeouts
//! - [`KeyValueStore`]: cache contract, with [`MemoryStore`] and [`FileStore`]
//! - [`remove_non_ascii`]: ASCII filtering for cache keys

mod cache;
mod http;
mod text;

pub use cache::{CacheResult, FileStore, KeyValueStore, MemoryStore};
pub use http::HttpClient;
pub use text::remove_non_ascii;
