//! Translation of [`SearchQuery`] values into CCL.

use crate::models::SearchQuery;

/// Bib-1 use attribute for ISSN
const ISSN_USE_ATTRIBUTE: u32 = 8;

/// Quote escaping for CCL terms: double quotes are removed
pub fn escape(term: &str) -> String {
    term.replace('"', "")
}

/// CCL for a search, clauses in the order author, title, isbn, issn
pub fn search_query(query: &SearchQuery) -> String {
    let mut clauses = Vec::with_capacity(2);

    if let Some(author) = query.author() {
        clauses.push(format!("(au=\"{}\")", escape(author)));
    }
    if let Some(title) = query.title() {
        clauses.push(format!("(ti=\"{}\")", escape(title)));
    }
    if let Some(isbn) = query.isbn() {
        clauses.push(format!("(isbn=\"{}\")", escape(isbn)));
    }
    if let Some(issn) = query.issn() {
        clauses.push(format!("((1,{ISSN_USE_ATTRIBUTE})=\"{}\")", escape(issn)));
    }

    clauses.join(" and ")
}

/// CCL looking a record up by control number under the given use attribute
pub fn control_number_query(control_number: &str, key: &str) -> String {
    format!("(1,{key})=\"{}\"", escape(control_number))
}
