//! Search and item endpoints over [`LibrarySearchService`].

use http::StatusCode;
use serde_json::{json, Value};

use super::params::{ApiError, ItemParams, SearchParams};
use super::representation::{
    record_hal, record_json, search_hal, search_json, LinkBuilder, Representation,
};
use crate::config::ApiConfig;
use crate::service::LibrarySearchService;

/// A rendered response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Value,
}

impl ApiResponse {
    fn ok(representation: Representation, body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: representation.content_type(),
            body,
        }
    }

    fn error(error: &ApiError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", error);
        } else {
            tracing::debug!("Rejected request: {}", error);
        }
        Self {
            status,
            content_type: Representation::Json.content_type(),
            body: json!({ "message": error.to_string() }),
        }
    }
}

/// The library endpoints
#[derive(Debug, Clone)]
pub struct LibraryApi {
    service: LibrarySearchService,
    links: LinkBuilder,
    default_count: usize,
}

impl LibraryApi {
    pub fn new(service: LibrarySearchService, config: &ApiConfig) -> Self {
        Self {
            service,
            links: LinkBuilder::new(&config.base_url),
            default_count: config.default_count,
        }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Run a search from typed parameters
    pub async fn search(
        &self,
        representation: Representation,
        params: &SearchParams,
    ) -> Result<Value, ApiError> {
        let page = self.service.search(&params.to_request()).await?;
        Ok(match representation {
            Representation::Json => search_json(params, &page),
            Representation::HalJson => search_hal(params, &page, &self.links),
        })
    }

    /// Fetch one record
    pub async fn item(
        &self,
        representation: Representation,
        control_number: &str,
        params: ItemParams,
    ) -> Result<Value, ApiError> {
        let record = self
            .service
            .get_media(control_number, params.availability)
            .await?;
        Ok(match representation {
            Representation::Json => record_json(&record),
            Representation::HalJson => record_hal(&record, &self.links),
        })
    }

    /// `GET <base>/search?<query>`
    pub async fn handle_search(&self, representation: Representation, query: &str) -> ApiResponse {
        let result = match SearchParams::from_query_string(query, self.default_count) {
            Ok(params) => self.search(representation, &params).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(body) => ApiResponse::ok(representation, body),
            Err(e) => ApiResponse::error(&e),
        }
    }

    /// `GET <base>/item:<id>/?<query>`
    pub async fn handle_item(
        &self,
        representation: Representation,
        control_number: &str,
        query: &str,
    ) -> ApiResponse {
        let params = ItemParams::from_query_string(query);
        match self.item(representation, control_number, params).await {
            Ok(body) => ApiResponse::ok(representation, body),
            Err(e) => ApiResponse::error(&e),
        }
    }
}
