//! Grouping of location fields into per-library holdings.

use indexmap::IndexMap;

use super::{first_value, tags, MarcRecord, Subfields};
use crate::models::{Holding, Library, LibraryLocation};

/// Group every 852 occurrence under its library, in encounter order.
///
/// Occurrences with neither a `$b` nor a `$c` cannot be placed and are
/// skipped.
pub fn group_holdings(record: &MarcRecord) -> IndexMap<LibraryLocation, Library> {
    let mut libraries: IndexMap<LibraryLocation, Library> = IndexMap::new();

    for field in record.fields(tags::LOCATION) {
        let location = location_of(field);
        if location.is_empty() {
            tracing::debug!(
                control_number = record.control_number(),
                "Skipping location field without branch codes"
            );
            continue;
        }

        libraries.entry(location).or_default().holdings.push(Holding {
            shelfmark: shelfmark(field),
            materials_specified: first_value(field, '3').map(str::to_string),
            ..Default::default()
        });
    }

    libraries
}

/// Branch codes (`$b`) followed by sub-branch codes (`$c`)
pub fn location_of(field: &Subfields) -> LibraryLocation {
    let branch = field.get(&'b').into_iter().flatten();
    let sub_branch = field.get(&'c').into_iter().flatten();
    LibraryLocation::new(branch.chain(sub_branch).cloned())
}

/// Shelfmark from `$h`, qualified by the copy number in `$t`
pub fn shelfmark(field: &Subfields) -> Option<String> {
    match (first_value(field, 'h'), first_value(field, 't')) {
        (Some(h), Some(t)) => Some(format!("{h} (copy {t})")),
        (Some(h), None) => Some(h.to_string()),
        (None, Some(t)) => Some(format!("Copy {t}")),
        (None, None) => None,
    }
}
