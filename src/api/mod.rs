//! Client-facing search and item endpoints.
//!
//! Parameters arrive as URL query strings and responses are rendered as plain
//! JSON or HAL. Service errors map onto HTTP status codes.

mod handlers;
mod params;
mod representation;

pub use handlers::{ApiResponse, LibraryApi};
pub use params::{parse_bool, ApiError, ItemParams, SearchParams};
pub use representation::{
    page_links, record_hal, record_json, search_hal, search_json, LinkBuilder, Representation,
};
