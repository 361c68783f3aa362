//! Library search service.
//!
//! Runs the whole pipeline for a request: build and validate the query,
//! serve the result set from the cache or the catalogue, parse the requested
//! page, annotate it with live availability and attach points of interest.

use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::availability::AvailabilityAnnotator;
use crate::config::Config;
use crate::marc::ParseError;
use crate::models::{
    BibliographicRecord, InconsistentQuery, SearchQuery, SearchRequest, SearchResultPage,
    StopWords,
};
use crate::places::{place_identifier, PlaceDirectory, PlaceLookup};
use crate::transport::{ccl, CatalogTransport, LazyResults, RawRecord};
use crate::utils::{remove_non_ascii, FileStore, KeyValueStore, MemoryStore};

/// Prefix of result-set cache keys
pub const CACHE_KEY_PREFIX: &str = "library_search";

/// Errors surfaced to callers of the service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    InconsistentQuery(#[from] InconsistentQuery),

    #[error("Catalogue unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record from catalogue: {0}")]
    InvalidRecord(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// HTTP status a handler should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InconsistentQuery(_) => StatusCode::BAD_REQUEST,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidRecord(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Cache key for a query: md5 of its ASCII-only fields
pub fn cache_key(query: &SearchQuery) -> String {
    let material = [query.title(), query.author(), query.isbn(), query.issn()]
        .map(|field| remove_non_ascii(field.unwrap_or_default()))
        .join("|");
    format!("{}_{:x}", CACHE_KEY_PREFIX, md5::compute(material.as_bytes()))
}

/// Searches the catalogue and shapes the results
#[derive(Debug, Clone)]
pub struct LibrarySearchService {
    transport: Arc<dyn CatalogTransport>,
    stop_words: StopWords,
    control_number_key: String,
    cache: Option<Arc<dyn KeyValueStore>>,
    cache_ttl: Duration,
    annotator: Option<AvailabilityAnnotator>,
    places: Option<Arc<dyn PlaceLookup>>,
    place_prefix: String,
}

impl LibrarySearchService {
    /// A service with default stop-words and no cache, availability or places
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        let config = Config::default();
        Self {
            transport,
            stop_words: StopWords::default(),
            control_number_key: config.catalog.control_number_key,
            cache: None,
            cache_ttl: Duration::from_secs(config.cache.ttl_seconds),
            annotator: None,
            places: None,
            place_prefix: config.places.identifier_prefix,
        }
    }

    /// Build every optional component the config enables
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn CatalogTransport>,
    ) -> Result<Self, ServiceError> {
        let mut service = Self::new(transport)
            .with_stop_words(config.query.stop_words())
            .with_control_number_key(&config.catalog.control_number_key);

        if config.cache.enabled {
            let store: Arc<dyn KeyValueStore> = match &config.cache.directory {
                Some(dir) => Arc::new(FileStore::new(dir).map_err(|e| {
                    ServiceError::Configuration(format!("cache directory {}: {}", dir.display(), e))
                })?),
                None => Arc::new(MemoryStore::new()),
            };
            service = service.with_cache(store, Duration::from_secs(config.cache.ttl_seconds));
        }

        let annotator = AvailabilityAnnotator::from_config(&config.availability)
            .map_err(|e| ServiceError::Configuration(format!("availability client: {}", e)))?;
        if let Some(annotator) = annotator {
            service = service.with_annotator(annotator);
        }

        if config.places.enabled {
            if let Some(path) = &config.places.directory {
                let directory = PlaceDirectory::load(path).map_err(|e| {
                    ServiceError::Configuration(format!("places {}: {}", path.display(), e))
                })?;
                service = service.with_places(Arc::new(directory), &config.places.identifier_prefix);
            }
        }

        Ok(service)
    }

    pub fn with_stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = stop_words;
        self
    }

    /// Bib-1 use attribute for control number lookups
    pub fn with_control_number_key(mut self, key: impl Into<String>) -> Self {
        self.control_number_key = key.into();
        self
    }

    /// Cache result sets in `store` for `ttl`
    pub fn with_cache(mut self, store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        self.cache = Some(store);
        self.cache_ttl = ttl;
        self
    }

    pub fn with_annotator(mut self, annotator: AvailabilityAnnotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Attach points of interest found under `<prefix>:<location>`
    pub fn with_places(mut self, places: Arc<dyn PlaceLookup>, prefix: impl Into<String>) -> Self {
        self.places = Some(places);
        self.place_prefix = prefix.into();
        self
    }

    /// Whether availability annotation is possible
    pub fn has_availability(&self) -> bool {
        self.annotator.is_some()
    }

    /// Run a search and return the requested page
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResultPage, ServiceError> {
        let query = SearchQuery::builder(&self.stop_words)
            .title(request.title.as_deref())
            .author(request.author.as_deref())
            .isbn(request.isbn.as_deref())
            .issn(request.issn.as_deref())
            .build()?;

        if !query.removed_stop_words().is_empty() {
            tracing::debug!("Removed stop words: {:?}", query.removed_stop_words());
        }

        let results = self.result_set(&query, request.no_cache).await?;

        let mut records = Vec::with_capacity(request.count.min(results.len()));
        for (offset, parsed) in results.slice(request.start, request.count).enumerate() {
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    position = request.start + offset,
                    "Skipping unparseable record: {}",
                    e
                ),
            }
        }

        for record in records.iter_mut() {
            self.enrich(record, request.availability).await;
        }

        Ok(SearchResultPage {
            size: results.len(),
            results: records,
            start: request.start,
            count: request.count,
        })
    }

    /// Look a record up by control number
    pub async fn get_media(
        &self,
        control_number: &str,
        availability: bool,
    ) -> Result<BibliographicRecord, ServiceError> {
        let query = ccl::control_number_query(control_number, &self.control_number_key);
        let results = self.run_query(&query).await?;

        let mut record = match results.get(0) {
            Some(parsed) => parsed?,
            None => return Err(ServiceError::NotFound(control_number.to_string())),
        };

        self.enrich(&mut record, availability).await;
        Ok(record)
    }

    /// The full result set for a query, from the cache when possible
    async fn result_set(
        &self,
        query: &SearchQuery,
        no_cache: bool,
    ) -> Result<LazyResults, ServiceError> {
        let key = cache_key(query);

        if let Some(cache) = self.cache.as_ref().filter(|_| !no_cache) {
            if let Some(cached) = cache.get(&key).hit() {
                match serde_json::from_str::<Vec<RawRecord>>(&cached) {
                    Ok(records) => {
                        tracing::debug!("Cache HIT for search: {}", key);
                        return Ok(records.into());
                    }
                    Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", key, e),
                }
            }
        }

        let results = self.run_query(&ccl::search_query(query)).await?;

        if let Some(cache) = &self.cache {
            match serde_json::to_string(results.raw()) {
                Ok(value) => {
                    if let Err(e) = cache.set_ex(&key, &value, self.cache_ttl) {
                        tracing::warn!("Failed to cache search result: {}", e);
                    } else {
                        tracing::debug!("Cached search result: {}", key);
                    }
                }
                Err(e) => tracing::warn!("Failed to serialize search result: {}", e),
            }
        }

        Ok(results)
    }

    /// Run one CCL query on a fresh connection.
    ///
    /// The connection is always closed and close errors are ignored. The
    /// resources-exhausted diagnostic is an empty result set.
    async fn run_query(&self, query: &str) -> Result<LazyResults, ServiceError> {
        tracing::debug!("Querying {}: {}", self.transport.describe(), query);

        let mut connection = self
            .transport
            .connect()
            .await
            .map_err(|e| ServiceError::ServiceUnavailable(e.to_string()))?;

        let result = connection.search(query).await;

        if let Err(e) = connection.close().await {
            tracing::debug!("Ignoring error closing catalogue connection: {}", e);
        }

        match result {
            Ok(records) => Ok(records.into()),
            Err(e) if e.is_resources_exhausted() => {
                tracing::debug!("No results for {}", query);
                Ok(LazyResults::default())
            }
            Err(e) => {
                tracing::error!("Catalogue query failed: {}", e);
                Err(ServiceError::ServiceUnavailable(e.to_string()))
            }
        }
    }

    async fn enrich(&self, record: &mut BibliographicRecord, availability: bool) {
        if availability {
            if let Some(annotator) = &self.annotator {
                annotator.annotate(record).await;
            }
        }
        self.attach_places(record).await;
    }

    async fn attach_places(&self, record: &mut BibliographicRecord) {
        let Some(places) = &self.places else {
            return;
        };
        for (location, library) in record.libraries.iter_mut() {
            let identifier = place_identifier(&self.place_prefix, location);
            match places.find_by_identifier(&identifier).await {
                Ok(poi) => library.poi = poi,
                Err(e) => tracing::warn!("Place lookup failed for {}: {}", identifier, e),
            }
        }
    }
}
