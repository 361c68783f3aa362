//! Transport to the remote bibliographic search endpoint.
//!
//! The catalogue speaks a session-oriented protocol: a connection is opened,
//! one or more CCL queries are run against it and it is closed again. The
//! [`CatalogTransport`] trait opens sessions, [`CatalogConnection`] runs
//! queries on one. Result sets come back as [`RawRecord`]s, which are parsed
//! lazily through [`LazyResults`].

pub mod ccl;
mod dump;
mod mock;
mod results;

pub use dump::DumpTransport;
pub use mock::MockTransport;
pub use results::LazyResults;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::CatalogConfig;

/// Bib-1 diagnostic returned when the target gives up on a query. The
/// catalogue sends it for searches with no hits.
pub const RESOURCES_EXHAUSTED: u32 = 31;

/// Bib-1 diagnostic for a query using an attribute the target does not index
pub const UNSUPPORTED_USE_ATTRIBUTE: u32 = 114;

/// One record as rendered by the catalogue, before parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(String);

impl RawRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawRecord {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for RawRecord {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Errors from the search endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be reached or dropped the session
    #[error("Connection error: {0}")]
    Connection(String),

    /// The endpoint rejected the query with a Bib-1 diagnostic
    #[error("Diagnostic {code}: {message}")]
    Diagnostic { code: u32, message: String },

    /// The endpoint sent something we could not interpret
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether this is the diagnostic signalling an empty result set
    pub fn is_resources_exhausted(&self) -> bool {
        matches!(
            self,
            TransportError::Diagnostic {
                code: RESOURCES_EXHAUSTED,
                ..
            }
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Connection(err.to_string())
    }
}

/// Opens sessions against the catalogue
#[async_trait]
pub trait CatalogTransport: Send + Sync + std::fmt::Debug {
    /// Human-readable description of the target, for logs
    fn describe(&self) -> String;

    /// Open a new session
    async fn connect(&self) -> Result<Box<dyn CatalogConnection>, TransportError>;
}

/// An open session
#[async_trait]
pub trait CatalogConnection: Send {
    /// Run a CCL query, returning the full ordered result set
    async fn search(&mut self, query: &str) -> Result<Vec<RawRecord>, TransportError>;

    /// Close the session
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Open the transport the catalogue config describes.
///
/// Only dump-backed catalogues can be served; a live target without a dump
/// is reported as a connection error.
pub fn transport_from_config(
    config: &CatalogConfig,
) -> Result<Arc<dyn CatalogTransport>, TransportError> {
    match &config.dump_path {
        Some(path) => {
            let transport = DumpTransport::open(path, &config.control_number_key)?;
            tracing::info!("Serving catalogue from {}", transport.describe());
            Ok(Arc::new(transport))
        }
        None => Err(TransportError::Connection(format!(
            "no client for target {} ({} in {}); set catalog.dump_path",
            config.target(),
            config.syntax,
            config.charset
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resources_exhausted() {
        let exhausted = TransportError::Diagnostic {
            code: RESOURCES_EXHAUSTED,
            message: "Resources exhausted - no results available".to_string(),
        };
        assert!(exhausted.is_resources_exhausted());

        let other = TransportError::Diagnostic {
            code: UNSUPPORTED_USE_ATTRIBUTE,
            message: "Unsupported use attribute".to_string(),
        };
        assert!(!other.is_resources_exhausted());
        assert!(!TransportError::Connection("refused".to_string()).is_resources_exhausted());
    }

    #[test]
    fn test_transport_from_config() {
        let mut config = CatalogConfig::default();
        match transport_from_config(&config) {
            Err(TransportError::Connection(message)) => {
                assert!(message.contains("localhost:210/Default"));
                assert!(message.contains("USMARC in UTF-8"));
            }
            other => panic!("expected a connection error, got {other:?}"),
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "LDR x\n001 000000001\n245 10$aDune").unwrap();
        config.dump_path = Some(file.path().to_path_buf());
        let transport = transport_from_config(&config).unwrap();
        assert!(transport.describe().contains("1 records"));
    }

    #[test]
    fn test_raw_record_serializes_as_string() {
        let raw = RawRecord::from("header\n001 1");
        assert_eq!(
            serde_json::to_string(&raw).unwrap(),
            r#""header\n001 1""#
        );
    }
}
