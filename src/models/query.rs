//! Catalogue search query validation and normalisation.
//!
//! A [`SearchQuery`] is either a free-text query (title and/or author) or an
//! identifier query (ISBN or ISSN), never both. Queries are built through
//! [`QueryBuilder`], which strips stop-words from the free-text fields and
//! normalises identifiers before checking that invariant.

use serde::Serialize;
use std::collections::HashSet;

/// Words dropped from title and author searches.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "an", "are", "as", "at", "be", "by", "com", "for", "from", "how", "in", "is",
    "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "where", "who",
    "will", "with", "www",
];

/// The query contradicts itself or is empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Inconsistent query: {0}")]
pub struct InconsistentQuery(pub String);

/// Case-sensitive set of words removed from free-text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    /// A stop-word set that removes nothing.
    pub fn none() -> Self {
        Self(HashSet::new())
    }

    /// Whether `word` is a stop-word (exact, case-sensitive match)
    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove stop-words from `text`.
    ///
    /// Returns the remaining words joined by single spaces and the words that
    /// were removed, in the order they appeared.
    pub fn strip(&self, text: &str) -> (String, Vec<String>) {
        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for word in text.split_whitespace() {
            if self.contains(word) {
                removed.push(word.to_string());
            } else {
                kept.push(word);
            }
        }
        (kept.join(" "), removed)
    }
}

impl Default for StopWords {
    fn default() -> Self {
        DEFAULT_STOP_WORDS.iter().copied().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for StopWords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Normalise an ISBN or ISSN.
///
/// `*` and `x` become `X`; every other character outside `[0-9X]` is dropped.
pub fn normalize_identifier(value: &str) -> String {
    value
        .chars()
        .filter_map(|c| match c {
            '*' | 'x' | 'X' => Some('X'),
            '0'..='9' => Some(c),
            _ => None,
        })
        .collect()
}

/// A validated, provider-neutral catalogue query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    issn: Option<String>,
    #[serde(skip)]
    removed_stop_words: Vec<String>,
}

impl SearchQuery {
    /// Start building a query that strips the given stop-words
    pub fn builder(stop_words: &StopWords) -> QueryBuilder<'_> {
        QueryBuilder::new(stop_words)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn isbn(&self) -> Option<&str> {
        self.isbn.as_deref()
    }

    pub fn issn(&self) -> Option<&str> {
        self.issn.as_deref()
    }

    /// Words removed from the title and author while building the query
    pub fn removed_stop_words(&self) -> &[String] {
        &self.removed_stop_words
    }

    /// Whether this is an ISBN or ISSN lookup rather than a free-text search
    pub fn is_identifier_query(&self) -> bool {
        self.isbn.is_some() || self.issn.is_some()
    }
}

/// Builder for [`SearchQuery`]
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    stop_words: &'a StopWords,
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
    issn: Option<String>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(stop_words: &'a StopWords) -> Self {
        Self {
            stop_words,
            title: None,
            author: None,
            isbn: None,
            issn: None,
        }
    }

    /// Set the title search term
    pub fn title<S: AsRef<str>>(mut self, title: Option<S>) -> Self {
        self.title = title.map(|t| t.as_ref().to_string());
        self
    }

    /// Set the author search term
    pub fn author<S: AsRef<str>>(mut self, author: Option<S>) -> Self {
        self.author = author.map(|a| a.as_ref().to_string());
        self
    }

    /// Set the ISBN to look up
    pub fn isbn<S: AsRef<str>>(mut self, isbn: Option<S>) -> Self {
        self.isbn = isbn.map(|i| i.as_ref().to_string());
        self
    }

    /// Set the ISSN to look up
    pub fn issn<S: AsRef<str>>(mut self, issn: Option<S>) -> Self {
        self.issn = issn.map(|i| i.as_ref().to_string());
        self
    }

    /// Normalise the fields and check the query invariant
    pub fn build(self) -> Result<SearchQuery, InconsistentQuery> {
        let mut removed_stop_words = Vec::new();
        let mut free_text = |value: Option<String>| {
            let (kept, removed) = self.stop_words.strip(value.as_deref()?);
            removed_stop_words.extend(removed);
            non_empty(kept)
        };
        let title = free_text(self.title);
        let author = free_text(self.author);

        let isbn = self.isbn.map(|i| normalize_identifier(&i)).and_then(non_empty);
        let issn = self.issn.map(|i| normalize_identifier(&i)).and_then(non_empty);

        if isbn.is_some() && issn.is_some() {
            return Err(InconsistentQuery(
                "ISBN and ISSN cannot be searched together".to_string(),
            ));
        }

        let has_free_text = title.is_some() || author.is_some();
        let has_identifier = isbn.is_some() || issn.is_some();

        if has_free_text && has_identifier {
            return Err(InconsistentQuery(
                "title or author cannot be combined with ISBN or ISSN".to_string(),
            ));
        }
        if !has_free_text && !has_identifier {
            return Err(InconsistentQuery(
                "at least one of title, author, ISBN or ISSN is required".to_string(),
            ));
        }

        Ok(SearchQuery {
            title,
            author,
            isbn,
            issn,
            removed_stop_words,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
