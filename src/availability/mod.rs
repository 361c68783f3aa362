//! Live availability annotation from the circulation-status feed.
//!
//! Annotation never fails the caller: a feed that cannot be reached or read
//! is logged and the record's holdings keep their UNKNOWN availability. The
//! per-library aggregate is computed either way.

mod circ_status;
mod reconcile;

pub use circ_status::{parse_circulation_status, CirculationItem};
pub use reconcile::{
    aggregate, availability_from_status, interpret_due_date, reconcile, sanitize_shelfmark,
    CirculationStatus, CLOSED_STACK_DISPLAY,
};

use reqwest::StatusCode;
use std::time::Duration;

use crate::config::AvailabilityConfig;
use crate::models::BibliographicRecord;
use crate::utils::HttpClient;

/// Errors fetching or reading the feed. Only logged, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Feed returned HTTP {0}")]
    Status(StatusCode),

    #[error("XML: {0}")]
    Xml(String),
}

impl From<reqwest::Error> for AnnotationError {
    fn from(err: reqwest::Error) -> Self {
        AnnotationError::Network(err.to_string())
    }
}

/// Fetches circulation status per record and reconciles it with holdings
#[derive(Debug, Clone)]
pub struct AvailabilityAnnotator {
    client: HttpClient,
    base_url: String,
    library: String,
}

impl AvailabilityAnnotator {
    pub fn new(client: HttpClient, base_url: impl Into<String>, library: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            library: library.into(),
        }
    }

    /// Build from config. `None` when no feed URL is configured.
    pub fn from_config(config: &AvailabilityConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(url) = config.url.as_deref().filter(|_| config.enabled) else {
            return Ok(None);
        };
        let client = HttpClient::new(Duration::from_secs(config.timeout_seconds))?;
        Ok(Some(Self::new(client, url, &config.library)))
    }

    /// Feed URL for a control number
    pub fn feed_url(&self, control_number: &str) -> String {
        format!(
            "{}?op=circ-status&library={}&sys_no={}",
            self.base_url,
            urlencoding::encode(&self.library),
            urlencoding::encode(control_number)
        )
    }

    /// Fetch and parse the feed for one record
    pub async fn fetch(&self, control_number: &str) -> Result<Vec<CirculationItem>, AnnotationError> {
        let url = self.feed_url(control_number);
        tracing::debug!("Fetching circulation status: {}", url);

        let response = self.client.client().get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AnnotationError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_circulation_status(&body)
    }

    /// Annotate the holdings of `record` in place and set library aggregates
    pub async fn annotate(&self, record: &mut BibliographicRecord) {
        match self.fetch(&record.control_number).await {
            Ok(items) => reconcile(record, &items),
            Err(e @ AnnotationError::Xml(_)) => {
                tracing::error!(
                    control_number = %record.control_number,
                    "Unable to parse availability information: {}",
                    e
                );
            }
            Err(e) => {
                tracing::warn!(
                    control_number = %record.control_number,
                    "Couldn't reach {}: {}",
                    self.base_url,
                    e
                );
            }
        }
        aggregate(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::parse_record;
    use crate::models::{Availability, LibraryLocation};
    use crate::transport::RawRecord;

    const RECORD: &str = "header\n\
        001 012345678\n\
        852   $bBOD $cBODBL $hM88.E01234 $t1\n\
        852   $bRSL $hQA76.73.C15 KER";

    const FEED: &str = "<circ-status>\
        <item-data><location>M88.E01234</location><due-date>Reference</due-date></item-data>\
        <item-data><location>QA76.73.C15 KER</location><due-date>Available</due-date></item-data>\
        </circ-status>";

    fn annotator(url: &str) -> AvailabilityAnnotator {
        AvailabilityAnnotator::new(
            HttpClient::new(Duration::from_secs(2)).unwrap(),
            url,
            "BIB01",
        )
    }

    #[test]
    fn test_feed_url() {
        let annotator = annotator("http://aleph.example/X");
        assert_eq!(
            annotator.feed_url("012345678"),
            "http://aleph.example/X?op=circ-status&library=BIB01&sys_no=012345678"
        );
    }

    #[test]
    fn test_from_config_requires_url() {
        let mut config = AvailabilityConfig::default();
        assert!(AvailabilityAnnotator::from_config(&config).unwrap().is_none());

        config.url = Some("http://aleph.example/X".to_string());
        assert!(AvailabilityAnnotator::from_config(&config).unwrap().is_some());

        config.enabled = false;
        assert!(AvailabilityAnnotator::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_annotate_from_feed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/X")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("op".into(), "circ-status".into()),
                mockito::Matcher::UrlEncoded("sys_no".into(), "012345678".into()),
            ]))
            .with_status(200)
            .with_body(FEED)
            .create_async()
            .await;

        let mut record = parse_record(&RawRecord::from(RECORD)).unwrap();
        annotator(&format!("{}/X", server.url()))
            .annotate(&mut record)
            .await;

        mock.assert_async().await;
        let bod = &record.libraries[&LibraryLocation::new(["BOD", "BODBL"])];
        assert_eq!(bod.holdings[0].availability, Availability::Reference);
        assert_eq!(bod.availability, Some(Availability::Reference));
        let rsl = &record.libraries[&LibraryLocation::new(["RSL"])];
        assert_eq!(rsl.availability, Some(Availability::Available));
    }

    #[tokio::test]
    async fn test_server_error_leaves_holdings_unknown() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let mut record = parse_record(&RawRecord::from(RECORD)).unwrap();
        annotator(&server.url()).annotate(&mut record).await;

        for library in record.libraries.values() {
            assert_eq!(library.availability, Some(Availability::Unknown));
        }
    }

    #[tokio::test]
    async fn test_unparseable_feed_leaves_holdings_unknown() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("<circ-status><<<")
            .create_async()
            .await;

        let annotator = annotator(&server.url());
        let err = annotator.fetch("1").await.unwrap_err();
        assert!(matches!(err, AnnotationError::Xml(_)));

        let mut record = parse_record(&RawRecord::from(RECORD)).unwrap();
        annotator.annotate(&mut record).await;
        assert!(record
            .holdings()
            .all(|(_, h)| h.availability == Availability::Unknown));
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_soft_failure() {
        // nothing listens on the discard port
        let mut record = parse_record(&RawRecord::from(RECORD)).unwrap();
        annotator("http://127.0.0.1:9/X").annotate(&mut record).await;
        assert!(record
            .holdings()
            .all(|(_, h)| h.availability == Availability::Unknown));
    }
}
