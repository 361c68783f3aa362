//! Lazily parsed result sets.

use std::sync::Arc;

use super::RawRecord;
use crate::marc::{parse_record, ParseError};
use crate::models::BibliographicRecord;

/// An ordered result set whose records are parsed only when read.
///
/// Length and slicing work on the raw records; nothing outside the requested
/// range is parsed. Cloning shares the underlying records.
#[derive(Debug, Clone, Default)]
pub struct LazyResults {
    records: Arc<[RawRecord]>,
}

impl LazyResults {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The unparsed records
    pub fn raw(&self) -> &[RawRecord] {
        &self.records
    }

    /// Parse the record at `index`
    pub fn get(&self, index: usize) -> Option<Result<BibliographicRecord, ParseError>> {
        self.records.get(index).map(parse_record)
    }

    /// Parse the records in `[start, start + count)`, clamped to the set
    pub fn slice(
        &self,
        start: usize,
        count: usize,
    ) -> impl Iterator<Item = Result<BibliographicRecord, ParseError>> + '_ {
        self.records.iter().skip(start).take(count).map(parse_record)
    }
}

impl From<Vec<RawRecord>> for LazyResults {
    fn from(records: Vec<RawRecord>) -> Self {
        Self::new(records)
    }
}
