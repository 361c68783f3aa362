//! Request parameter parsing.

use http::StatusCode;
use url::form_urlencoded;

use crate::models::{SearchRequest, DEFAULT_PAGE_SIZE};
use crate::service::ServiceError;

/// Errors answered to API clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => e.status_code(),
        }
    }
}

/// `true`/`false` in any case; anything else gives `default`
pub fn parse_bool(value: &str, default: bool) -> bool {
    match value.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => default,
    }
}

fn parse_number(name: &str, value: &str) -> Result<usize, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{name} must be a non-negative integer")))
}

/// Parameters of the search endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub availability: bool,
    pub start: usize,
    pub count: usize,
    pub no_cache: bool,
}

impl Default for SearchParams {
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

impl SearchParams {
    /// Parse a URL query string. Empty values count as absent.
    pub fn from_query_string(query: &str, default_count: usize) -> Result<Self, ApiError> {
        let mut params = Self {
            count: default_count,
            ..Self::default()
        };

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let text = Some(value.to_string()).filter(|v| !v.trim().is_empty());
            match key.as_ref() {
                "title" => params.title = text,
                "author" => params.author = text,
                "isbn" => params.isbn = text,
                "issn" => params.issn = text,
                "availability" => params.availability = parse_bool(&value, false),
                "no_cache" => params.no_cache = parse_bool(&value, false),
                "start" => params.start = parse_number("start", &value)?,
                "count" => params.count = parse_number("count", &value)?,
                _ => {}
            }
        }

        if params.count == 0 {
            return Err(ApiError::BadRequest("count must be at least 1".to_string()));
        }
        Ok(params)
    }

    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            issn: self.issn.clone(),
            availability: self.availability,
            start: self.start,
            count: self.count,
            no_cache: self.no_cache,
        }
    }

    /// Query parameters echoed into links, in a fixed order
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        for (key, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
            ("issn", &self.issn),
        ] {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        if self.availability {
            pairs.push(("availability", "true".to_string()));
        }
        pairs
    }
}

/// Parameters of the item endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemParams {
    pub availability: bool,
}

impl Default for ItemParams {
    fn default() -> Self {
        Self { availability: true }
    }
}

impl ItemParams {
    pub fn from_query_string(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key == "availability" {
                params.availability = parse_bool(&value, true);
            }
        }
        params
    }
}
