//! # Catalog Search
//!
//! A library-catalogue search API: title/author/ISBN/ISSN queries are sent to
//! a bibliographic search endpoint, the returned MARC records are parsed,
//! optionally annotated with live circulation status and location data, and
//! rendered as paginated JSON or HAL.
//!
//! ## Architecture
//!
//! - [`models`]: Queries, bibliographic records and result pages
//! - [`transport`]: Catalogue sessions, CCL translation, lazy result sets
//! - [`marc`]: MARC line-format parser and holdings grouping
//! - [`availability`]: Circulation-status feed and shelfmark reconciliation
//! - [`places`]: Point-of-interest lookup for library locations
//! - [`service`]: The search pipeline, caching and error translation
//! - [`api`]: Parameter parsing and JSON/HAL representations
//! - [`utils`]: HTTP client, cache stores and text helpers
//! - [`config`]: Configuration management

pub mod api;
pub mod availability;
pub mod config;
pub mod marc;
pub mod models;
pub mod places;
pub mod service;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use models::{BibliographicRecord, SearchQuery, SearchRequest, SearchResultPage};
pub use service::{LibrarySearchService, ServiceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
