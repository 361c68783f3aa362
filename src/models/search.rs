//! Search request and result page models.

use serde::{Deserialize, Serialize};

use crate::models::BibliographicRecord;

/// Page size used when a request does not specify one
pub const DEFAULT_PAGE_SIZE: usize = 35;

/// Search request parameters as received from a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Title search term
    pub title: Option<String>,

    /// Author search term
    pub author: Option<String>,

    /// ISBN lookup
    pub isbn: Option<String>,

    /// ISSN lookup
    pub issn: Option<String>,

    /// Whether to annotate the returned page with live availability
    pub availability: bool,

    /// Index of the first result to return
    pub start: usize,

    /// Number of results to return
    pub count: usize,

    /// Skip the cached result set (the fresh one is still stored)
    pub no_cache: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            isbn: None,
            issn: None,
            availability: false,
            start: 0,
            count: DEFAULT_PAGE_SIZE,
            no_cache: false,
        }
    }
}

impl SearchRequest {
    /// Create an empty request with the default page
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title search term
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author search term
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the ISBN
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// Set the ISSN
    pub fn issn(mut self, issn: impl Into<String>) -> Self {
        self.issn = Some(issn.into());
        self
    }

    /// Enable/disable availability annotation
    pub fn availability(mut self, availability: bool) -> Self {
        self.availability = availability;
        self
    }

    /// Select the page `[start, start + count)`
    pub fn page(mut self, start: usize, count: usize) -> Self {
        self.start = start;
        self.count = count;
        self
    }

    /// Bypass the cached result set
    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultPage {
    /// Total number of matching records
    pub size: usize,

    /// Records in `[start, start + count)`
    pub results: Vec<BibliographicRecord>,

    pub start: usize,

    pub count: usize,
}

impl SearchResultPage {
    /// A page of an empty result set
    pub fn empty(start: usize, count: usize) -> Self {
        Self {
            size: 0,
            results: Vec::new(),
            start,
            count,
        }
    }

    /// Whether results exist after this page
    pub fn has_next(&self) -> bool {
        self.start.saturating_add(self.count) < self.size
    }

    /// Whether results exist before this page
    pub fn has_prev(&self) -> bool {
        self.start > 0 && self.size > 0
    }
}
