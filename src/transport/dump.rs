//! Offline transport answering queries from a dump of raw records.
//!
//! A dump is a text file of records in the catalogue's line format, separated
//! by blank lines. CCL clauses are matched against the parsed records the way
//! the catalogue's keyword indexes behave: every word of the term must occur,
//! case-insensitively, in the indexed field. Queries that match nothing fail
//! with the resources-exhausted diagnostic, as the live catalogue does.

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

use super::{
    CatalogConnection, CatalogTransport, RawRecord, TransportError, RESOURCES_EXHAUSTED,
    UNSUPPORTED_USE_ATTRIBUTE,
};
use crate::marc::MarcRecord;
use crate::models::normalize_identifier;

const CLAUSE_PATTERN: &str = r#"(?:\(\s*)?(?P<attr>[a-z]+|\(\d+,\d+\))\s*=\s*"(?P<term>[^"]*)""#;

#[derive(Debug)]
struct DumpEntry {
    raw: RawRecord,
    record: MarcRecord,
}

/// Transport over an in-memory dump of raw records
#[derive(Debug, Clone)]
pub struct DumpTransport {
    entries: Arc<Vec<DumpEntry>>,
    control_number_key: String,
    source: String,
}

impl DumpTransport {
    /// Load a dump file
    pub fn open(path: &Path, control_number_key: &str) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut transport = Self::from_text(&text, control_number_key);
        transport.source = path.display().to_string();
        Ok(transport)
    }

    /// Build from dump text. Records that fail to parse are dropped.
    pub fn from_text(text: &str, control_number_key: &str) -> Self {
        let entries = split_records(text)
            .into_iter()
            .filter_map(|raw| match MarcRecord::parse(&raw) {
                Ok(record) => Some(DumpEntry {
                    raw: RawRecord::new(raw),
                    record,
                }),
                Err(e) => {
                    tracing::warn!("Dropping unparseable record from dump: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!("Loaded {} records from dump", entries.len());

        Self {
            entries: Arc::new(entries),
            control_number_key: control_number_key.to_string(),
            source: "inline dump".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn run(&self, query: &str) -> Result<Vec<RawRecord>, TransportError> {
        let pattern =
            Regex::new(CLAUSE_PATTERN).map_err(|e| TransportError::Protocol(e.to_string()))?;

        let clauses = pattern
            .captures_iter(query)
            .map(|caps| Clause::new(&caps["attr"], &caps["term"], &self.control_number_key))
            .collect::<Result<Vec<_>, _>>()?;

        if clauses.is_empty() {
            return Err(TransportError::Protocol(format!(
                "Could not parse CCL query: {query}"
            )));
        }

        let hits: Vec<RawRecord> = self
            .entries
            .iter()
            .filter(|entry| clauses.iter().all(|c| c.matches(&entry.record)))
            .map(|entry| entry.raw.clone())
            .collect();

        if hits.is_empty() {
            return Err(TransportError::Diagnostic {
                code: RESOURCES_EXHAUSTED,
                message: "Resources exhausted - no results available".to_string(),
            });
        }
        Ok(hits)
    }
}

#[async_trait]
impl CatalogTransport for DumpTransport {
    fn describe(&self) -> String {
        format!("dump {} ({} records)", self.source, self.entries.len())
    }

    async fn connect(&self) -> Result<Box<dyn CatalogConnection>, TransportError> {
        Ok(Box::new(DumpConnection {
            transport: self.clone(),
            open: true,
        }))
    }
}

struct DumpConnection {
    transport: DumpTransport,
    open: bool,
}

#[async_trait]
impl CatalogConnection for DumpConnection {
    async fn search(&mut self, query: &str) -> Result<Vec<RawRecord>, TransportError> {
        if !self.open {
            return Err(TransportError::Connection("session closed".to_string()));
        }
        self.transport.run(query)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}

#[derive(Debug)]
enum Clause {
    Author(Vec<String>),
    Title(Vec<String>),
    Isbn(String),
    Issn(String),
    ControlNumber(String),
}

impl Clause {
    fn new(attr: &str, term: &str, control_number_key: &str) -> Result<Self, TransportError> {
        let terms = || words(term);
        match attr {
            "au" => Ok(Clause::Author(terms())),
            "ti" => Ok(Clause::Title(terms())),
            "isbn" => Ok(Clause::Isbn(normalize_identifier(term))),
            "(1,8)" => Ok(Clause::Issn(normalize_identifier(term))),
            _ if attr == format!("(1,{control_number_key})") => {
                Ok(Clause::ControlNumber(term.to_string()))
            }
            _ => Err(TransportError::Diagnostic {
                code: UNSUPPORTED_USE_ATTRIBUTE,
                message: format!("Unsupported use attribute: {attr}"),
            }),
        }
    }

    fn matches(&self, record: &MarcRecord) -> bool {
        match self {
            Clause::Author(words) => contains_words(record.author(), words),
            Clause::Title(words) => contains_words(record.title(), words),
            Clause::Isbn(isbn) => record
                .isbns()
                .iter()
                .any(|candidate| normalize_identifier(candidate) == *isbn),
            Clause::Issn(issn) => record
                .issns()
                .iter()
                .any(|candidate| normalize_identifier(candidate) == *issn),
            Clause::ControlNumber(id) => record.control_number() == Some(id.as_str()),
        }
    }
}

/// Lowercased words of `text`, punctuation dropped
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_words(field: Option<String>, terms: &[String]) -> bool {
    let Some(field) = field else {
        return false;
    };
    let field = words(&field);
    terms.iter().all(|term| field.contains(term))
}

/// Split dump text on blank lines
fn split_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        records.push(current.join("\n"));
    }
    records
}
