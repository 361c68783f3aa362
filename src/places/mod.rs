//! Point-of-interest lookup for library locations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::models::{LibraryLocation, PointOfInterest};

/// Errors from a places backend
#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for PlaceError {
    fn from(err: serde_json::Error) -> Self {
        PlaceError::Parse(format!("JSON: {}", err))
    }
}

/// Finds points of interest by provider identifier
#[async_trait]
pub trait PlaceLookup: Send + Sync + std::fmt::Debug {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<PointOfInterest>, PlaceError>;
}

/// Provider identifier for a location: `<prefix>:<segments joined by />`,
/// with each `/` escaped as `\/`.
pub fn place_identifier(prefix: &str, location: &LibraryLocation) -> String {
    format!("{}:{}", prefix, location.identifier().replace('/', "\\/"))
}

/// Points of interest loaded from a JSON object keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct PlaceDirectory {
    places: HashMap<String, PointOfInterest>,
}

impl PlaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory file
    pub fn load(path: &Path) -> Result<Self, PlaceError> {
        let content = std::fs::read_to_string(path)?;
        let directory = Self::from_json(&content)?;
        tracing::debug!(
            "Loaded {} places from {}",
            directory.len(),
            path.display()
        );
        Ok(directory)
    }

    pub fn from_json(json: &str) -> Result<Self, PlaceError> {
        Ok(Self {
            places: serde_json::from_str(json)?,
        })
    }

    /// Add or replace a place
    pub fn insert(&mut self, identifier: impl Into<String>, poi: PointOfInterest) {
        self.places.insert(identifier.into(), poi);
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait]
impl PlaceLookup for PlaceDirectory {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<PointOfInterest>, PlaceError> {
        Ok(self.places.get(identifier).cloned())
    }
}
