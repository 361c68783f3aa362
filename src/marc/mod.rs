//! Parser for the line-oriented MARC rendering returned by the catalogue.
//!
//! # Record Format
//!
//! ```text
//! <header line, ignored>
//! 001 012345678
//! 020   $a0131103628 $cpbk.
//! 245 14$aThe C programming language / $cBrian W. Kernighan.
//! 852   $bBOD $cBODBL $hM88.E01234 $t1
//! ```
//!
//! Every line after the header is `<tag> <data>`. Data fields carry two
//! indicator characters followed by `$` and a ` $`-separated list of
//! subfields, each starting with its one-character code. Lines whose third
//! data character is not `$` (control fields such as 008) have no subfields.
//!
//! Fields and subfields are never overwritten: repeated tags accumulate
//! occurrences and repeated subfield codes accumulate values.

pub mod holdings;

use std::collections::BTreeMap;

use crate::models::BibliographicRecord;
use crate::transport::RawRecord;

/// Field tags used by the catalogue
pub mod tags {
    pub const CONTROL_NUMBER: u16 = 1;
    pub const ISBN: u16 = 20;
    pub const ISSN: u16 = 22;
    pub const AUTHOR: u16 = 100;
    pub const TITLE_STATEMENT: u16 = 245;
    pub const EDITION: u16 = 250;
    pub const PUBLICATION: u16 = 260;
    pub const PHYSICAL_DESCRIPTION: u16 = 300;
    pub const LOCATION: u16 = 852;
}

/// Subfield values of one field occurrence, keyed by subfield code.
///
/// Codes iterate in sort order, which is the order derived values use.
pub type Subfields = BTreeMap<char, Vec<String>>;

/// Errors raised while parsing a raw record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A line without the space separating tag from data
    #[error("Malformed line {line}: no tag/data separator in {content:?}")]
    MalformedLine { line: usize, content: String },

    /// The record has no 001 field
    #[error("Record has no control number")]
    MissingControlNumber,
}

/// A raw record split into tagged fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarcRecord {
    control_number: Option<String>,
    fields: BTreeMap<u16, Vec<Subfields>>,
}

impl MarcRecord {
    /// Parse the text of one record
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut record = Self::default();

        for (index, line) in raw.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }

            let (tag, data) = line
                .split_once(' ')
                .ok_or_else(|| ParseError::MalformedLine {
                    line: index + 1,
                    content: line.to_string(),
                })?;

            let tag: u16 = match tag.parse() {
                Ok(tag) => tag,
                Err(_) => {
                    tracing::debug!(line = index + 1, tag, "Skipping line with non-numeric tag");
                    continue;
                }
            };

            if tag == tags::CONTROL_NUMBER {
                record.control_number = Some(data.to_string());
            }

            let Some(subfield_data) = subfield_data(data) else {
                continue;
            };

            record
                .fields
                .entry(tag)
                .or_default()
                .push(parse_subfields(subfield_data));
        }

        Ok(record)
    }

    pub fn control_number(&self) -> Option<&str> {
        self.control_number.as_deref()
    }

    /// All occurrences of a field, in record order
    pub fn fields(&self, tag: u16) -> &[Subfields] {
        self.fields.get(&tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// First occurrence of a field
    pub fn first_field(&self, tag: u16) -> Option<&Subfields> {
        self.fields(tag).first()
    }

    /// All values of the first occurrence of `tag`, in subfield code order,
    /// joined by spaces.
    pub fn joined_field(&self, tag: u16) -> Option<String> {
        let field = self.first_field(tag)?;
        let text = field
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn title(&self) -> Option<String> {
        self.joined_field(tags::TITLE_STATEMENT)
    }

    pub fn author(&self) -> Option<String> {
        self.joined_field(tags::AUTHOR)
    }

    pub fn publisher(&self) -> Option<String> {
        self.joined_field(tags::PUBLICATION)
    }

    pub fn edition(&self) -> Option<String> {
        self.joined_field(tags::EDITION)
    }

    pub fn description(&self) -> Option<String> {
        self.joined_field(tags::PHYSICAL_DESCRIPTION)
    }

    /// One ISBN per 020 occurrence.
    ///
    /// Falls back to the cancelled/invalid ISBN in `$z`, marked as such.
    pub fn isbns(&self) -> Vec<String> {
        self.fields(tags::ISBN)
            .iter()
            .map(|field| match first_value(field, 'a') {
                Some(isbn) => isbn.to_string(),
                None => format!("{} (invalid)", first_value(field, 'z').unwrap_or("Unknown")),
            })
            .collect()
    }

    /// The `$a` of each 022 occurrence that has one
    pub fn issns(&self) -> Vec<String> {
        self.fields(tags::ISSN)
            .iter()
            .filter_map(|field| first_value(field, 'a'))
            .map(str::to_string)
            .collect()
    }

    /// Number of location fields
    pub fn copies(&self) -> usize {
        self.fields(tags::LOCATION).len()
    }

    /// Build the structured record, grouping holdings by location
    pub fn into_bibliographic(self) -> Result<BibliographicRecord, ParseError> {
        let control_number = self
            .control_number
            .clone()
            .ok_or(ParseError::MissingControlNumber)?;

        Ok(BibliographicRecord {
            control_number,
            title: self.title(),
            author: self.author(),
            publisher: self.publisher(),
            edition: self.edition(),
            description: self.description(),
            isbns: self.isbns(),
            issns: self.issns(),
            copies: self.copies(),
            libraries: holdings::group_holdings(&self),
        })
    }
}

/// Parse a raw record straight into a [`BibliographicRecord`]
pub fn parse_record(raw: &RawRecord) -> Result<BibliographicRecord, ParseError> {
    MarcRecord::parse(raw.as_str())?.into_bibliographic()
}

/// First value of a subfield code
pub fn first_value(field: &Subfields, code: char) -> Option<&str> {
    field.get(&code)?.first().map(String::as_str)
}

/// The subfield part of a data field, if the line has one.
///
/// Data fields have the shape `<ind1><ind2>$<subfields>`.
fn subfield_data(data: &str) -> Option<&str> {
    let mut chars = data.char_indices();
    let (_, marker) = chars.nth(2)?;
    if marker != '$' {
        return None;
    }
    let start = chars.next().map_or(data.len(), |(index, _)| index);
    Some(&data[start..])
}

fn parse_subfields(data: &str) -> Subfields {
    let mut subfields = Subfields::new();
    for chunk in data.split(" $") {
        let mut chars = chunk.chars();
        let Some(code) = chars.next() else {
            continue;
        };
        subfields
            .entry(code)
            .or_default()
            .push(chars.as_str().to_string());
    }
    subfields
}
