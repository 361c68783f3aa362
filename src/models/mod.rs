//! Core data models for catalogue queries, records and result pages.

mod query;
mod record;
mod search;

pub use query::{
    normalize_identifier, InconsistentQuery, QueryBuilder, SearchQuery, StopWords,
    DEFAULT_STOP_WORDS,
};
pub use record::{
    Availability, BibliographicRecord, Holding, Library, LibraryLocation, PointOfInterest,
};
pub use search::{SearchRequest, SearchResultPage, DEFAULT_PAGE_SIZE};
