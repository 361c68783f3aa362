//! Mock transport for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{CatalogConnection, CatalogTransport, RawRecord, TransportError};

#[derive(Debug, Default)]
struct MockState {
    records: Vec<RawRecord>,
    responses: HashMap<String, Result<Vec<RawRecord>, TransportError>>,
    connect_error: Option<TransportError>,
    close_error: Option<TransportError>,
    queries: Vec<String>,
    opened: usize,
    closed: usize,
}

/// A transport that returns predefined responses and records how it was used.
///
/// Clones share state, so a test can keep a handle after giving one to the
/// service.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every query without its own response with these records
    pub fn with_records<I, R>(self, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RawRecord>,
    {
        self.state().records = records.into_iter().map(Into::into).collect();
        self
    }

    /// Answer `query` with these records
    pub fn respond<I, R>(&self, query: impl Into<String>, records: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<RawRecord>,
    {
        let records = records.into_iter().map(Into::into).collect();
        self.state().responses.insert(query.into(), Ok(records));
    }

    /// Fail `query` with `error`
    pub fn fail(&self, query: impl Into<String>, error: TransportError) {
        self.state().responses.insert(query.into(), Err(error));
    }

    /// Fail every connection attempt
    pub fn fail_connect(&self, error: TransportError) {
        self.state().connect_error = Some(error);
    }

    /// Fail every close
    pub fn fail_close(&self, error: TransportError) {
        self.state().close_error = Some(error);
    }

    /// Queries run so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }

    /// Number of sessions opened
    pub fn opened(&self) -> usize {
        self.state().opened
    }

    /// Number of sessions closed (including failed closes)
    pub fn closed(&self) -> usize {
        self.state().closed
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogTransport for MockTransport {
    fn describe(&self) -> String {
        "mock catalogue".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn CatalogConnection>, TransportError> {
        let mut state = self.state();
        if let Some(error) = &state.connect_error {
            return Err(error.clone());
        }
        state.opened += 1;
        Ok(Box::new(MockConnection {
            transport: self.clone(),
        }))
    }
}

struct MockConnection {
    transport: MockTransport,
}

#[async_trait]
impl CatalogConnection for MockConnection {
    async fn search(&mut self, query: &str) -> Result<Vec<RawRecord>, TransportError> {
        let mut state = self.transport.state();
        state.queries.push(query.to_string());
        match state.responses.get(query) {
            Some(response) => response.clone(),
            None => Ok(state.records.clone()),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut state = self.transport.state();
        state.closed += 1;
        match &state.close_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_responses() {
        let transport = MockTransport::new().with_records(["header\n001 1"]);
        transport.fail(
            "(ti=\"broken\")",
            TransportError::Protocol("bad".to_string()),
        );

        let mut connection = transport.connect().await.unwrap();
        assert_eq!(connection.search("(ti=\"any\")").await.unwrap().len(), 1);
        assert!(connection.search("(ti=\"broken\")").await.is_err());
        connection.close().await.unwrap();

        assert_eq!(transport.queries().len(), 2);
        assert_eq!(transport.opened(), 1);
        assert_eq!(transport.closed(), 1);
    }
}
